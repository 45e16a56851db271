//! Storage seam used by the controller.
//!
//! The controller only talks to [`EntryStore`], so storage can be swapped
//! (or made to fail in tests) without touching coordination logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CacheDb, CacheEntry};
use crate::Error;
use crate::fingerprint::Fingerprint;

/// Durable mapping from fingerprint to cache entry.
///
/// Every method is atomic for a single fingerprint. Failures are reported as
/// [`Error::StoreUnavailable`].
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, Error>;

    /// Insert, or replace the whole entry if the fingerprint exists.
    async fn put(&self, entry: &CacheEntry) -> Result<(), Error>;

    /// Record a reuse and return the updated entry.
    async fn touch(&self, fingerprint: &Fingerprint, at: DateTime<Utc>) -> Result<Option<CacheEntry>, Error>;

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool, Error>;

    /// Delete only if the entry still holds `generated_code`.
    async fn delete_if_code(&self, fingerprint: &Fingerprint, generated_code: &str) -> Result<bool, Error>;

    /// Point-in-time snapshot of all entries.
    async fn list(&self) -> Result<Vec<CacheEntry>, Error>;

    async fn clear(&self) -> Result<u64, Error>;

    async fn count(&self) -> Result<u64, Error>;

    async fn top(&self, limit: usize) -> Result<Vec<CacheEntry>, Error>;

    async fn purge_unused_since(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;

    async fn evict_lru(&self, max_entries: usize) -> Result<u64, Error>;
}

#[async_trait]
impl EntryStore for CacheDb {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, Error> {
        self.get_entry(fingerprint).await
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.put_entry(entry).await
    }

    async fn touch(&self, fingerprint: &Fingerprint, at: DateTime<Utc>) -> Result<Option<CacheEntry>, Error> {
        self.touch_entry(fingerprint, at).await
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool, Error> {
        self.delete_entry(fingerprint).await
    }

    async fn delete_if_code(&self, fingerprint: &Fingerprint, generated_code: &str) -> Result<bool, Error> {
        self.delete_entry_if_code(fingerprint, generated_code).await
    }

    async fn list(&self) -> Result<Vec<CacheEntry>, Error> {
        self.list_entries().await
    }

    async fn clear(&self) -> Result<u64, Error> {
        self.clear_entries().await
    }

    async fn count(&self) -> Result<u64, Error> {
        self.count_entries().await
    }

    async fn top(&self, limit: usize) -> Result<Vec<CacheEntry>, Error> {
        self.top_entries(limit).await
    }

    async fn purge_unused_since(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        CacheDb::purge_unused_since(self, cutoff).await
    }

    async fn evict_lru(&self, max_entries: usize) -> Result<u64, Error> {
        self.purge_lru_entries(max_entries).await
    }
}
