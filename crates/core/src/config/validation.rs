//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_entries` is set to 0
    /// - `max_age_days` is 0
    /// - `top_n` is 0 or exceeds 100
    /// - `generation_timeout_ms` is below 100ms
    /// - `cleanup_interval_secs` is set to 0
    /// - `db_path` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing { field: "db_path".into(), hint: "Set USCRAPE_DB_PATH".into() });
        }

        if self.max_entries == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_entries".into(),
                reason: "must be greater than 0 when set".into(),
            });
        }

        if self.max_age_days == 0 {
            return Err(ConfigError::Invalid { field: "max_age_days".into(), reason: "must be at least 1 day".into() });
        }

        if self.top_n == 0 || self.top_n > 100 {
            return Err(ConfigError::Invalid { field: "top_n".into(), reason: "must be between 1 and 100".into() });
        }

        if let Some(timeout) = self.generation_timeout_ms
            && timeout < 100
        {
            return Err(ConfigError::Invalid {
                field: "generation_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }

        if self.cleanup_interval_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "cleanup_interval_secs".into(),
                reason: "must be greater than 0 when set".into(),
            });
        }

        if self.cleanup_interval_secs.is_some() && !self.cache_enabled {
            tracing::warn!("cleanup_interval_secs is set while the cache starts disabled; maintenance still runs");
        }

        Ok(())
    }
}
