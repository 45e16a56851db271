//! Cache façade for the scrape pipeline.
//!
//! [`CacheController`] hides fingerprinting, storage, and request coalescing
//! behind `get_or_generate`. Share one instance (behind an `Arc`) between all
//! concurrent scrapes; the enabled flag and hit/miss counters live here rather
//! than in any global.
//!
//! Nothing on this path is fatal. A document that cannot be fingerprinted or
//! a store that cannot be reached degrades to calling the generator directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, EntryStore};
use crate::collaborators::{CodeGenerator, Document, ExtractionVerifier};
use crate::config::AppConfig;
use crate::coordinator::{Coordinator, Role};
use crate::fingerprint::{Fingerprint, fingerprint};
use crate::stats::{CacheStats, Counters, TopEntry};
use crate::{Error, GenerationError};

/// Tunables for a controller instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Capacity bound applied by [`CacheController::run_maintenance`].
    pub max_entries: Option<usize>,
    /// Age bound applied by [`CacheController::run_maintenance`].
    pub max_age: Duration,
    /// Entries reported by [`CacheController::stats`].
    pub top_n: usize,
    pub generation_timeout: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CacheSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            max_age: config.max_age(),
            top_n: config.top_n,
            generation_timeout: config.generation_timeout(),
        }
    }
}

/// Where the code returned by a lookup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    /// Reused from the store.
    Hit,
    /// Generated by this call and stored.
    Generated,
    /// Generated by a concurrent call for the same fingerprint.
    Shared,
    /// Generated without reading or writing the store.
    Uncached,
}

/// Result of [`CacheController::get_or_generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub code: String,
    /// Cache key used, if the lookup went through the store.
    pub fingerprint: Option<Fingerprint>,
    pub source: LookupSource,
}

/// Entries removed by one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MaintenanceReport {
    pub expired: u64,
    pub evicted: u64,
}

/// Fingerprint cache façade.
pub struct CacheController {
    store: Arc<dyn EntryStore>,
    coordinator: Coordinator,
    counters: Counters,
    enabled: AtomicBool,
    settings: CacheSettings,
}

impl CacheController {
    /// Create an enabled controller over `store`.
    pub fn new(store: Arc<dyn EntryStore>, settings: CacheSettings) -> Self {
        Self {
            store,
            coordinator: Coordinator::new(),
            counters: Counters::default(),
            enabled: AtomicBool::new(true),
            settings,
        }
    }

    /// Create a controller using the settings and initial enabled flag from `config`.
    pub fn from_config(store: Arc<dyn EntryStore>, config: &AppConfig) -> Self {
        let controller = Self::new(store, CacheSettings::from(config));
        controller.enabled.store(config.cache_enabled, Ordering::SeqCst);
        controller
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        info!("fingerprint cache enabled");
    }

    /// Bypass the cache. Stored entries are kept.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        info!("fingerprint cache disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Generations currently in progress.
    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }

    /// Return extraction code for `document`, generating it at most once per
    /// structure and field set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] when the generator fails, times out, or
    /// the leading call for the same fingerprint was cancelled. Storage and
    /// parse failures never surface here.
    pub async fn get_or_generate(
        &self, document: &Document, target_fields: &[String], generator: &dyn CodeGenerator,
    ) -> Result<Lookup, Error> {
        if !self.is_enabled() {
            debug!(url = %document.url, "cache disabled, generating directly");
            return self.generate_uncached(document, target_fields, generator).await;
        }

        let Some(key) = cache_key(document, target_fields) else {
            self.counters.record_miss();
            return self.generate_uncached(document, target_fields, generator).await;
        };

        match self.store.touch(&key, Utc::now()).await {
            Ok(Some(entry)) => {
                self.counters.record_hit();
                debug!(fingerprint = %key, url = %document.url, use_count = entry.use_count, "cache hit");
                return Ok(Lookup { code: entry.generated_code, fingerprint: Some(key), source: LookupSource::Hit });
            }
            Ok(None) => debug!(fingerprint = %key, url = %document.url, "cache miss"),
            Err(e) => {
                warn!(fingerprint = %key, error = %e, "cache store unavailable, generating without cache");
                self.counters.record_miss();
                return self.generate_uncached(document, target_fields, generator).await;
            }
        }

        self.coordinate(key, document, target_fields, generator, true).await
    }

    /// Like [`get_or_generate`](Self::get_or_generate), but reused code is
    /// checked by `verifier` first.
    ///
    /// Code the verifier rejects is deleted and regenerated; the caller only
    /// sees the replacement.
    pub async fn get_or_generate_verified(
        &self, document: &Document, target_fields: &[String], generator: &dyn CodeGenerator,
        verifier: &dyn ExtractionVerifier,
    ) -> Result<Lookup, Error> {
        let lookup = self.get_or_generate(document, target_fields, generator).await?;
        let (LookupSource::Hit, Some(key)) = (lookup.source, lookup.fingerprint) else {
            return Ok(lookup);
        };

        let verdict = verifier.verify(&lookup.code, document).await;
        if verdict.is_valid() {
            return Ok(lookup);
        }

        let signal = Error::InvalidatedEntry(format!("{key}: {verdict:?}"));
        info!(url = %document.url, reason = %signal, "cached code rejected, regenerating");

        // Only drop the code that was judged; a concurrent caller may already have replaced it.
        match self.store.delete_if_code(&key, &lookup.code).await {
            Ok(true) => {}
            Ok(false) => debug!(fingerprint = %key, "rejected code already replaced"),
            Err(e) => {
                warn!(fingerprint = %key, error = %e, "could not invalidate entry, generating without cache");
                return self.generate_uncached(document, target_fields, generator).await;
            }
        }

        self.coordinate(key, document, target_fields, generator, false).await
    }

    /// Lead or follow the generation for `key`.
    ///
    /// `record` is false when the caller already counted this request.
    async fn coordinate(
        &self, key: Fingerprint, document: &Document, target_fields: &[String], generator: &dyn CodeGenerator,
        record: bool,
    ) -> Result<Lookup, Error> {
        let flight = match self.coordinator.join(key) {
            Role::Leader(flight) => flight,
            Role::Follower(waiter) => {
                if record {
                    self.counters.record_miss();
                }
                debug!(fingerprint = %key, "waiting on in-flight generation");
                let code = waiter.wait().await?;
                return Ok(Lookup { code, fingerprint: Some(key), source: LookupSource::Shared });
            }
        };

        // A previous leader may have stored this key after our miss.
        match self.store.touch(&key, Utc::now()).await {
            Ok(Some(entry)) => {
                if record {
                    self.counters.record_hit();
                }
                flight.complete(Ok(entry.generated_code.clone()));
                return Ok(Lookup { code: entry.generated_code, fingerprint: Some(key), source: LookupSource::Hit });
            }
            Ok(None) => {}
            Err(e) => warn!(fingerprint = %key, error = %e, "cache store unavailable during re-check"),
        }

        if record {
            self.counters.record_miss();
        }

        let outcome = self.generate(document, target_fields, generator).await;
        if let Ok(code) = &outcome {
            let entry = CacheEntry::new(key, code.as_str(), document.url.as_str(), target_fields, Utc::now());
            match self.store.put(&entry).await {
                Ok(()) => info!(fingerprint = %key, url = %document.url, "cached generated code"),
                Err(e) => warn!(fingerprint = %key, error = %e, "failed to cache generated code"),
            }
        }

        flight.complete(outcome.clone());
        let code = outcome?;
        Ok(Lookup { code, fingerprint: Some(key), source: LookupSource::Generated })
    }

    async fn generate_uncached(
        &self, document: &Document, target_fields: &[String], generator: &dyn CodeGenerator,
    ) -> Result<Lookup, Error> {
        let code = self.generate(document, target_fields, generator).await?;
        Ok(Lookup { code, fingerprint: None, source: LookupSource::Uncached })
    }

    async fn generate(
        &self, document: &Document, target_fields: &[String], generator: &dyn CodeGenerator,
    ) -> Result<String, GenerationError> {
        let started = Instant::now();
        let result = match self.settings.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, generator.generate(document, target_fields))
                .await
                .unwrap_or_else(|_| Err(GenerationError::timed_out(limit))),
            None => generator.generate(document, target_fields).await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(url = %document.url, elapsed_ms, "generated extraction code"),
            Err(e) => warn!(url = %document.url, elapsed_ms, error = %e, "code generation failed"),
        }
        result
    }

    /// Read an entry without recording a use.
    pub async fn entry(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, Error> {
        self.store.get(fingerprint).await
    }

    /// Delete one entry so the next lookup regenerates it.
    pub async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<bool, Error> {
        let removed = self.store.delete(fingerprint).await?;
        debug!(fingerprint = %fingerprint, removed, "invalidated entry");
        Ok(removed)
    }

    /// Delete every entry. Hit/miss counters are left alone.
    pub async fn clear(&self) -> Result<u64, Error> {
        let removed = self.store.clear().await?;
        info!(removed, "cleared fingerprint cache");
        Ok(removed)
    }

    pub fn reset_counters(&self) {
        self.counters.reset();
    }

    /// Stats with the configured number of top entries.
    pub async fn stats(&self) -> Result<CacheStats, Error> {
        self.stats_with_top(self.settings.top_n).await
    }

    pub async fn stats_with_top(&self, top_n: usize) -> Result<CacheStats, Error> {
        let (hits, misses) = self.counters.snapshot();
        let total_entries = self.store.count().await?;
        let top_entries = self.store.top(top_n).await?.iter().map(TopEntry::from).collect();
        Ok(CacheStats::new(total_entries, hits, misses, top_entries))
    }

    /// Delete entries not used within `max_age`. Returns the number removed.
    ///
    /// A zero age removes everything; an age beyond the calendar removes nothing.
    pub async fn cleanup_older_than(&self, max_age: Duration) -> Result<u64, Error> {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            debug!(?max_age, "cleanup age exceeds representable range, nothing to remove");
            return Ok(0);
        };

        let removed = self.store.purge_unused_since(cutoff).await?;
        info!(removed, ?max_age, "removed stale cache entries");
        Ok(removed)
    }

    /// Evict least recently used entries until at most `max_entries` remain.
    pub async fn evict_to_capacity(&self, max_entries: usize) -> Result<u64, Error> {
        let evicted = self.store.evict_lru(max_entries).await?;
        if evicted > 0 {
            info!(evicted, max_entries, "evicted least recently used entries");
        }
        Ok(evicted)
    }

    /// Apply the configured age and capacity bounds.
    pub async fn run_maintenance(&self) -> Result<MaintenanceReport, Error> {
        let expired = self.cleanup_older_than(self.settings.max_age).await?;
        let evicted = match self.settings.max_entries {
            Some(max) => self.evict_to_capacity(max).await?,
            None => 0,
        };
        Ok(MaintenanceReport { expired, evicted })
    }
}

/// Store key for a document, or None when it must not be cached.
fn cache_key(document: &Document, target_fields: &[String]) -> Option<Fingerprint> {
    match fingerprint(&document.html) {
        Ok(fp) if fp.is_empty() => {
            debug!(url = %document.url, "empty document, skipping cache");
            None
        }
        Ok(fp) => Some(fp.scoped(target_fields)),
        Err(e) => {
            warn!(url = %document.url, error = %e, "could not fingerprint document, skipping cache");
            None
        }
    }
}
