//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (USCRAPE_*)
//! 2. TOML config file (if USCRAPE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (USCRAPE_*)
/// 2. TOML config file (if USCRAPE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via USCRAPE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Whether lookups go through the cache at startup.
    ///
    /// Set via USCRAPE_CACHE_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Upper bound on stored entries, enforced by maintenance.
    ///
    /// Set via USCRAPE_MAX_ENTRIES environment variable.
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Entries unused for this many days are removed by maintenance.
    ///
    /// Set via USCRAPE_MAX_AGE_DAYS environment variable.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,

    /// Number of entries reported in `top_entries`.
    ///
    /// Set via USCRAPE_TOP_N environment variable.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Abort a code generation call after this many milliseconds.
    ///
    /// Set via USCRAPE_GENERATION_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub generation_timeout_ms: Option<u64>,

    /// Run maintenance on this interval when set.
    ///
    /// Set via USCRAPE_CLEANUP_INTERVAL_SECS environment variable.
    #[serde(default)]
    pub cleanup_interval_secs: Option<u64>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./uscrape-cache.sqlite")
}

fn default_true() -> bool {
    true
}

fn default_max_age_days() -> u64 {
    30
}

fn default_top_n() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_enabled: true,
            max_entries: None,
            max_age_days: default_max_age_days(),
            top_n: default_top_n(),
            generation_timeout_ms: None,
            cleanup_interval_secs: None,
        }
    }
}

impl AppConfig {
    /// Maximum entry age as a Duration.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days.saturating_mul(24 * 60 * 60))
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_ms.map(Duration::from_millis)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        self.cleanup_interval_secs.map(Duration::from_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `USCRAPE_`
    /// 2. TOML file from `USCRAPE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("USCRAPE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("USCRAPE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./uscrape-cache.sqlite"));
        assert!(config.cache_enabled);
        assert!(config.max_entries.is_none());
        assert_eq!(config.max_age_days, 30);
        assert_eq!(config.top_n, 5);
        assert!(config.generation_timeout_ms.is_none());
        assert!(config.cleanup_interval_secs.is_none());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig {
            max_age_days: 2,
            generation_timeout_ms: Some(1_500),
            cleanup_interval_secs: Some(60),
            ..Default::default()
        };
        assert_eq!(config.max_age(), Duration::from_secs(2 * 86_400));
        assert_eq!(config.generation_timeout(), Some(Duration::from_millis(1_500)));
        assert_eq!(config.cleanup_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("uscrape.toml", "top_n = 7\nmax_age_days = 10\n")?;
            jail.set_env("USCRAPE_CONFIG_FILE", "uscrape.toml");
            jail.set_env("USCRAPE_MAX_AGE_DAYS", "14");
            jail.set_env("USCRAPE_CACHE_ENABLED", "false");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.top_n, 7);
            assert_eq!(config.max_age_days, 14);
            assert!(!config.cache_enabled);
            Ok(())
        });
    }
}
