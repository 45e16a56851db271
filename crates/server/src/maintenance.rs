//! Periodic cache maintenance.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uscrape_core::CacheController;

/// Run [`CacheController::run_maintenance`] every `every`, starting one period from now.
pub fn spawn(controller: Arc<CacheController>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match controller.run_maintenance().await {
                Ok(report) => info!(expired = report.expired, evicted = report.evicted, "cache maintenance complete"),
                Err(e) => warn!(error = %e, "cache maintenance failed"),
            }
        }
    })
}
