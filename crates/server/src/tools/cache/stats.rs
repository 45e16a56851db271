//! cache_stats tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uscrape_core::{CacheController, CacheStats, Error};

use crate::tools::json_result;

/// Parameters for the cache_stats tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsParams {
    /// Number of most reused entries to report (defaults to the configured value).
    #[serde(default)]
    pub top_n: Option<usize>,
}

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    /// Whether lookups currently go through the cache.
    pub enabled: bool,
    /// Generations in progress right now.
    pub in_flight: usize,
    #[serde(flatten)]
    pub stats: CacheStats,
}

/// Implementation of the cache_stats tool.
pub async fn stats_impl(controller: &CacheController, params: CacheStatsParams) -> Result<CallToolResult, McpError> {
    let stats = match params.top_n {
        Some(0) => return Err(Error::InvalidInput("top_n must be greater than 0".into()).into()),
        Some(n) if n > 100 => return Err(Error::InvalidInput("top_n must be at most 100".into()).into()),
        Some(n) => controller.stats_with_top(n).await?,
        None => controller.stats().await?,
    };

    json_result(&CacheStatsOutput { enabled: controller.is_enabled(), in_flight: controller.in_flight(), stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::decode;
    use std::sync::Arc;
    use uscrape_core::{CacheDb, CacheEntry, CacheSettings, Fingerprint};

    async fn seeded() -> CacheController {
        let db = CacheDb::open_in_memory().await.unwrap();
        for (byte, url) in [(1u8, "https://a.example/"), (2, "https://b.example/"), (3, "https://c.example/")] {
            let fingerprint = Fingerprint::from_bytes([byte; Fingerprint::LEN]);
            let mut entry = CacheEntry::new(fingerprint, "code", url, &[], chrono::Utc::now());
            entry.use_count = u64::from(byte);
            db.put_entry(&entry).await.unwrap();
        }
        CacheController::new(Arc::new(db), CacheSettings::default())
    }

    #[tokio::test]
    async fn test_stats_default_top() {
        let controller = seeded().await;

        let output: CacheStatsOutput = decode(&stats_impl(&controller, CacheStatsParams::default()).await.unwrap());
        assert!(output.enabled);
        assert_eq!(output.in_flight, 0);
        assert_eq!(output.stats.total_entries, 3);
        assert_eq!(output.stats.hit_rate, 0.0);
        assert_eq!(output.stats.top_entries[0].source_url, "https://c.example/");
        assert_eq!(output.stats.top_entries[0].use_count, 3);
    }

    #[tokio::test]
    async fn test_stats_top_override() {
        let controller = seeded().await;
        controller.disable();

        let params = CacheStatsParams { top_n: Some(1) };
        let output: CacheStatsOutput = decode(&stats_impl(&controller, params).await.unwrap());
        assert!(!output.enabled);
        assert_eq!(output.stats.top_entries.len(), 1);
    }

    #[tokio::test]
    async fn test_stats_rejects_zero_top() {
        let controller = seeded().await;
        let result = stats_impl(&controller, CacheStatsParams { top_n: Some(0) }).await;
        assert!(result.is_err());
    }
}
