//! Age-based cleanup and LRU capacity eviction.
//!
//! Both are explicit operations. Nothing here runs on the lookup path.

use super::connection::CacheDb;
use super::entries::timestamp;
use crate::Error;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;

impl CacheDb {
    /// Delete entries whose last use is at or before `cutoff`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_unused_since(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cutoff = timestamp(cutoff);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE last_used_at <= ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete least recently used entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru_entries(&self, max_entries: usize) -> Result<u64, Error> {
        // A bound beyond what SQLite can count evicts nothing.
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM entries WHERE fingerprint IN (
                    SELECT fingerprint FROM entries ORDER BY last_used_at ASC, use_count ASC LIMIT ?1
                )",
                    params![count - max],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
