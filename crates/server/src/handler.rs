//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use crate::tools::cache::{
    CacheCleanupParams, CacheGetParams, CacheStatsParams, cleanup_impl, clear_impl, disable_impl, enable_impl,
    get_impl, reset_counters_impl, stats_impl,
};
use crate::tools::{FingerprintParams, fingerprint_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use uscrape_core::CacheController;

/// The main MCP server handler for uscrape.
#[derive(Clone)]
pub struct UscrapeServer {
    tool_router: ToolRouter<Self>,
    controller: Arc<CacheController>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl UscrapeServer {
    /// Create a new server handler around a shared cache controller.
    pub fn new(controller: Arc<CacheController>) -> Self {
        Self { tool_router: Self::tool_router(), controller }
    }

    /// Compute the structural fingerprint of an HTML document.
    #[tool(
        description = "Compute the structural fingerprint of an HTML document and the cache key for a set of target fields. Does not read or write the cache."
    )]
    async fn fingerprint(&self, params: Parameters<FingerprintParams>) -> Result<CallToolResult, McpError> {
        fingerprint_impl(params.0).await
    }

    #[tool(description = "Retrieve a cached extraction entry by its 32-character cache key.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.controller, params.0).await
    }

    #[tool(description = "Report cache size, hit/miss counters, hit rate, and the most reused entries.")]
    async fn cache_stats(&self, params: Parameters<CacheStatsParams>) -> Result<CallToolResult, McpError> {
        stats_impl(&self.controller, params.0).await
    }

    #[tool(
        description = "Remove entries unused for older_than_days and/or evict down to max_entries. With no arguments, applies the configured bounds."
    )]
    async fn cache_cleanup(&self, params: Parameters<CacheCleanupParams>) -> Result<CallToolResult, McpError> {
        cleanup_impl(&self.controller, params.0).await
    }

    #[tool(description = "Delete every cached entry. Hit/miss counters are kept.")]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        clear_impl(&self.controller).await
    }

    #[tool(description = "Route lookups through the cache.")]
    async fn cache_enable(&self) -> Result<CallToolResult, McpError> {
        enable_impl(&self.controller)
    }

    #[tool(description = "Bypass the cache. Stored entries are kept.")]
    async fn cache_disable(&self) -> Result<CallToolResult, McpError> {
        disable_impl(&self.controller)
    }

    #[tool(description = "Reset the hit/miss counters to zero.")]
    async fn cache_reset_counters(&self) -> Result<CallToolResult, McpError> {
        reset_counters_impl(&self.controller)
    }
}

impl ServerHandler for UscrapeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "uscrape".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uscrape_core::{CacheDb, CacheSettings};

    #[tokio::test]
    async fn test_router_lists_all_tools() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let server = UscrapeServer::new(Arc::new(CacheController::new(Arc::new(db), CacheSettings::default())));

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            [
                "cache_cleanup",
                "cache_clear",
                "cache_disable",
                "cache_enable",
                "cache_get",
                "cache_reset_counters",
                "cache_stats",
                "fingerprint",
            ]
        );
    }
}
