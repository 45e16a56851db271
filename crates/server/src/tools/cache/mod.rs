//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and managing the fingerprint cache.

pub mod cleanup;
pub mod control;
pub mod get;
pub mod stats;

pub use cleanup::{CacheCleanupParams, cleanup_impl};
pub use control::{clear_impl, disable_impl, enable_impl, reset_counters_impl};
pub use get::{CacheGetParams, get_impl};
pub use stats::{CacheStatsParams, stats_impl};
