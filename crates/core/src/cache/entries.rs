//! Entry CRUD operations.
//!
//! Creates, reads, touches, and deletes cached extraction code. Rows are
//! replaced wholesale on `put`; the only in-place update is `touch`, which
//! bumps the use count and refreshes the last-used timestamp in one statement.

use super::connection::CacheDb;
use crate::Error;
use crate::fingerprint::{Fingerprint, normalize_fields};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Row, types::Type};

const ENTRY_COLUMNS: &str =
    "fingerprint, generated_code, source_url, target_fields_json, created_at, last_used_at, use_count";

/// Generated extraction code cached under a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub generated_code: String,
    /// URL of the page whose generation created this entry.
    pub source_url: String,
    /// Normalized field names the code extracts.
    pub target_fields: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub use_count: u64,
}

impl CacheEntry {
    /// A freshly generated entry. The creating call counts as the first use.
    pub fn new(
        fingerprint: Fingerprint, generated_code: impl Into<String>, source_url: impl Into<String>,
        target_fields: &[String], now: DateTime<Utc>,
    ) -> Self {
        Self {
            fingerprint,
            generated_code: generated_code.into(),
            source_url: source_url.into(),
            target_fields: normalize_fields(target_fields),
            created_at: now,
            last_used_at: now,
            use_count: 1,
        }
    }
}

/// Fixed-width UTC timestamp, so lexical order in SQLite is chronological.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    let fingerprint: String = row.get(0)?;
    let target_fields: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let last_used_at: String = row.get(5)?;

    Ok(CacheEntry {
        fingerprint: fingerprint
            .parse()
            .map_err(|e: Error| conversion_error(0, e.to_string()))?,
        generated_code: row.get(1)?,
        source_url: row.get(2)?,
        target_fields: serde_json::from_str(&target_fields).map_err(|e| conversion_error(3, e))?,
        created_at: parse_timestamp(4, &created_at)?,
        last_used_at: parse_timestamp(5, &last_used_at)?,
        use_count: row.get::<_, i64>(6)? as u64,
    })
}

fn select_one(conn: &rusqlite::Connection, fingerprint: &str) -> Result<Option<CacheEntry>, Error> {
    let mut stmt = conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE fingerprint = ?1"))?;

    match stmt.query_row(params![fingerprint], entry_from_row) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl CacheDb {
    /// Insert an entry, replacing any existing row for its fingerprint.
    pub async fn put_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let fields_json = serde_json::to_string(&entry.target_fields)
            .map_err(|e| Error::InvalidInput(format!("failed to encode target fields: {e}")))?;
        let entry = entry.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    fingerprint, generated_code, source_url, target_fields_json,
                    created_at, last_used_at, use_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(fingerprint) DO UPDATE SET
                    generated_code = excluded.generated_code,
                    source_url = excluded.source_url,
                    target_fields_json = excluded.target_fields_json,
                    created_at = excluded.created_at,
                    last_used_at = excluded.last_used_at,
                    use_count = excluded.use_count",
                    params![
                        entry.fingerprint.to_string(),
                        &entry.generated_code,
                        &entry.source_url,
                        fields_json,
                        timestamp(entry.created_at),
                        timestamp(entry.last_used_at),
                        entry.use_count as i64,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by fingerprint without recording a use.
    pub async fn get_entry(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, Error> {
        let fingerprint = fingerprint.to_string();
        self.conn
            .call(move |conn| select_one(conn, &fingerprint))
            .await
            .map_err(Error::from)
    }

    /// Record a use: increment `use_count`, refresh `last_used_at`.
    ///
    /// Returns the updated entry, or None if the fingerprint is not cached.
    /// `last_used_at` never moves backwards.
    pub async fn touch_entry(&self, fingerprint: &Fingerprint, at: DateTime<Utc>) -> Result<Option<CacheEntry>, Error> {
        let fingerprint = fingerprint.to_string();
        let at = timestamp(at);
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let updated = conn.execute(
                    "UPDATE entries
                     SET use_count = use_count + 1,
                         last_used_at = MAX(last_used_at, ?2)
                     WHERE fingerprint = ?1",
                    params![&fingerprint, at],
                )?;
                if updated == 0 {
                    return Ok(None);
                }
                select_one(conn, &fingerprint)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete an entry. Returns whether a row was removed.
    pub async fn delete_entry(&self, fingerprint: &Fingerprint) -> Result<bool, Error> {
        let fingerprint = fingerprint.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE fingerprint = ?1", params![fingerprint])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete an entry only if it still holds `generated_code`.
    ///
    /// Returns false when the entry is gone or was already replaced.
    pub async fn delete_entry_if_code(&self, fingerprint: &Fingerprint, generated_code: &str) -> Result<bool, Error> {
        let fingerprint = fingerprint.to_string();
        let generated_code = generated_code.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE fingerprint = ?1 AND generated_code = ?2",
                    params![fingerprint, generated_code],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Snapshot of every entry, most recently used first.
    pub async fn list_entries(&self) -> Result<Vec<CacheEntry>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheEntry>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY last_used_at DESC"
                ))?;
                let entries = stmt
                    .query_map([], entry_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Most used entries, ties broken by most recent use.
    pub async fn top_entries(&self, limit: usize) -> Result<Vec<CacheEntry>, Error> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntry>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries
                     ORDER BY use_count DESC, last_used_at DESC
                     LIMIT ?1"
                ))?;
                let entries = stmt
                    .query_map(params![limit], entry_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry. Returns the number removed.
    pub async fn clear_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
