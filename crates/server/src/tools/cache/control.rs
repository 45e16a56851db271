//! cache_clear, cache_enable, cache_disable, and cache_reset_counters.
//!
//! Toggling never touches stored entries; clearing never touches counters.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uscrape_core::CacheController;

use crate::tools::json_result;

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Output from the cache_enable and cache_disable tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheToggleOutput {
    pub enabled: bool,
}

/// Output from the cache_reset_counters tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheResetOutput {
    pub hits: u64,
    pub misses: u64,
}

pub async fn clear_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let deleted = controller.clear().await?;
    json_result(&CacheClearOutput { deleted })
}

pub fn enable_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    controller.enable();
    json_result(&CacheToggleOutput { enabled: controller.is_enabled() })
}

pub fn disable_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    controller.disable();
    json_result(&CacheToggleOutput { enabled: controller.is_enabled() })
}

pub fn reset_counters_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    controller.reset_counters();
    json_result(&CacheResetOutput { hits: 0, misses: 0 })
}
