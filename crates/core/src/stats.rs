//! Hit/miss counters and the derived stats view.

use std::sync::atomic::{AtomicU64, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;

/// Process-lifetime lookup counters.
///
/// Independent of stored entries: clearing the store leaves these alone.
#[derive(Debug, Default)]
pub struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Current (hits, misses).
    pub fn snapshot(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// One of the most reused entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TopEntry {
    pub source_url: String,
    pub use_count: u64,
}

impl From<&CacheEntry> for TopEntry {
    fn from(entry: &CacheEntry) -> Self {
        Self { source_url: entry.source_url.clone(), use_count: entry.use_count }
    }
}

/// Cache statistics, derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CacheStats {
    pub total_entries: u64,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0.0 before any lookup.
    pub hit_rate: f64,
    /// Sorted by use count, then most recent use.
    pub top_entries: Vec<TopEntry>,
}

impl CacheStats {
    pub fn new(total_entries: u64, hits: u64, misses: u64, top_entries: Vec<TopEntry>) -> Self {
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 };
        Self { total_entries, hits, misses, hit_rate, top_entries }
    }
}
