//! cache_get tool implementation.
//!
//! Retrieves a cache entry by key without counting it as a use.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uscrape_core::{CacheController, CacheEntry, Error, Fingerprint};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The cache key (32 hex characters) of the entry to retrieve.
    pub fingerprint: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheGetOutput {
    /// The cached entry.
    pub entry: CacheEntry,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(controller: &CacheController, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let fingerprint: Fingerprint = params.fingerprint.trim().parse()?;

    let entry = controller
        .entry(&fingerprint)
        .await?
        .ok_or_else(|| Error::CacheMiss(fingerprint.to_string()))?;

    json_result(&CacheGetOutput { entry })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::decode;
    use std::sync::Arc;
    use uscrape_core::{CacheDb, CacheSettings};

    async fn setup() -> (CacheController, CacheDb) {
        let db = CacheDb::open_in_memory().await.unwrap();
        (CacheController::new(Arc::new(db.clone()), CacheSettings::default()), db)
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (controller, _db) = setup().await;
        let params = CacheGetParams { fingerprint: "ab".repeat(16) };

        let err = get_impl(&controller, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_invalid_fingerprint() {
        let (controller, _db) = setup().await;
        let params = CacheGetParams { fingerprint: "nonexistent".to_string() };

        let err = get_impl(&controller, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_get_impl_found_does_not_touch() {
        let (controller, db) = setup().await;
        let fingerprint = Fingerprint::from_bytes([7; Fingerprint::LEN]);
        let entry = CacheEntry::new(
            fingerprint,
            "def extract(html): ...",
            "https://jobs.example/1",
            &["title".to_string()],
            chrono::Utc::now(),
        );
        db.put_entry(&entry).await.unwrap();

        let params = CacheGetParams { fingerprint: fingerprint.to_string() };
        let output: CacheGetOutput = decode(&get_impl(&controller, params).await.unwrap());

        assert_eq!(output.entry, entry);
        assert_eq!(db.get_entry(&fingerprint).await.unwrap().unwrap().use_count, 1);
    }
}
