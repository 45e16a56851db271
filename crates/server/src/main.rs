//! uscrape-mcp server entry point.
//!
//! Boots the fingerprint cache and serves its management tools over stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use uscrape_core::{AppConfig, CacheController, CacheDb};

mod handler;
mod maintenance;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), enabled = config.cache_enabled, "Opening fingerprint cache");

    let db = CacheDb::open(&config.db_path).await?;
    let controller = Arc::new(CacheController::from_config(Arc::new(db), &config));

    if let Some(every) = config.cleanup_interval() {
        tracing::info!(interval_secs = every.as_secs(), "Scheduling cache maintenance");
        maintenance::spawn(Arc::clone(&controller), every);
    }

    tracing::info!("Starting uscrape-mcp server on stdio transport");

    let handler = handler::UscrapeServer::new(controller);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
