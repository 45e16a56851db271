//! cache_cleanup tool implementation.
//!
//! Removes entries by age, by count, or by the configured bounds when no
//! argument is given.

use std::time::Duration;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uscrape_core::{CacheController, Error, MaintenanceReport};

use crate::tools::json_result;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Parameters for the cache_cleanup tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheCleanupParams {
    /// Remove entries not used within this many days. 0 removes every entry.
    #[serde(default)]
    pub older_than_days: Option<u64>,

    /// Keep only the N most recently used entries.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Implementation of the cache_cleanup tool.
pub async fn cleanup_impl(
    controller: &CacheController, params: CacheCleanupParams,
) -> Result<CallToolResult, McpError> {
    if params.max_entries == Some(0) {
        return Err(Error::InvalidInput("max_entries must be greater than 0".to_string()).into());
    }

    let report = if params.older_than_days.is_none() && params.max_entries.is_none() {
        controller.run_maintenance().await?
    } else {
        let mut report = MaintenanceReport::default();
        if let Some(days) = params.older_than_days {
            let max_age = Duration::from_secs(days.saturating_mul(SECS_PER_DAY));
            report.expired = controller.cleanup_older_than(max_age).await?;
        }
        if let Some(max_entries) = params.max_entries {
            report.evicted = controller.evict_to_capacity(max_entries).await?;
        }
        report
    };

    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::decode;
    use chrono::Utc;
    use std::sync::Arc;
    use uscrape_core::{CacheDb, CacheEntry, CacheSettings, Fingerprint};

    async fn seeded(settings: CacheSettings) -> (CacheController, CacheDb) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let ages = [(1u8, 40), (2, 10), (3, 0)];
        for (byte, days) in ages {
            let fingerprint = Fingerprint::from_bytes([byte; Fingerprint::LEN]);
            let at = now - chrono::Duration::days(days);
            let url = format!("https://example.com/{byte}");
            db.put_entry(&CacheEntry::new(fingerprint, "code", url, &[], at)).await.unwrap();
        }
        (CacheController::new(Arc::new(db.clone()), settings), db)
    }

    #[tokio::test]
    async fn test_cleanup_by_age() {
        let (controller, db) = seeded(CacheSettings::default()).await;
        let params = CacheCleanupParams { older_than_days: Some(30), max_entries: None };

        let output: MaintenanceReport = decode(&cleanup_impl(&controller, params).await.unwrap());
        assert_eq!(output, MaintenanceReport { expired: 1, evicted: 0 });
        assert_eq!(db.count_entries().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_lru() {
        let (controller, db) = seeded(CacheSettings::default()).await;
        let params = CacheCleanupParams { older_than_days: None, max_entries: Some(1) };

        let output: MaintenanceReport = decode(&cleanup_impl(&controller, params).await.unwrap());
        assert_eq!(output.evicted, 2);
        let remaining = db.list_entries().await.unwrap();
        assert_eq!(remaining[0].source_url, "https://example.com/3");
    }

    #[tokio::test]
    async fn test_cleanup_zero_days_removes_all() {
        let (controller, db) = seeded(CacheSettings::default()).await;
        let params = CacheCleanupParams { older_than_days: Some(0), max_entries: None };

        let output: MaintenanceReport = decode(&cleanup_impl(&controller, params).await.unwrap());
        assert_eq!(output.expired, 3);
        assert_eq!(db.count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_defaults_to_configured_bounds() {
        let settings = CacheSettings { max_entries: Some(1), ..Default::default() };
        let (controller, db) = seeded(settings).await;

        let output: MaintenanceReport = decode(&cleanup_impl(&controller, CacheCleanupParams::default()).await.unwrap());
        assert_eq!(output, MaintenanceReport { expired: 1, evicted: 1 });
        assert_eq!(db.count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_huge_capacity_evicts_nothing() {
        let (controller, db) = seeded(CacheSettings::default()).await;
        let params = CacheCleanupParams { older_than_days: None, max_entries: Some(usize::MAX) };

        let output: MaintenanceReport = decode(&cleanup_impl(&controller, params).await.unwrap());
        assert_eq!(output, MaintenanceReport { expired: 0, evicted: 0 });
        assert_eq!(db.count_entries().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_cleanup_rejects_zero_capacity() {
        let (controller, _db) = seeded(CacheSettings::default()).await;
        let params = CacheCleanupParams { older_than_days: None, max_entries: Some(0) };

        let result = cleanup_impl(&controller, params).await;
        assert!(result.is_err());
    }
}
