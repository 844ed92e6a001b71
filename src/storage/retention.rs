//! Age-based pruning, run as housekeeping next to the API

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, instrument};

use super::backend::StorageBackend;

/// How often housekeeping prunes
pub const PRUNE_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Prune now and then every [`PRUNE_PERIOD`] until the task is aborted.
pub fn spawn_retention_task(store: Arc<dyn StorageBackend>, retention_days: u32) -> JoinHandle<()> {
    tokio::spawn(run_retention(store, retention_days, PRUNE_PERIOD))
}

#[instrument(skip(store))]
async fn run_retention(store: Arc<dyn StorageBackend>, retention_days: u32, period: Duration) {
    info!("pruning snapshots older than {retention_days} days every {period:?}");
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        match store.prune(retention_days).await {
            Ok(0) => {}
            Ok(deleted) => info!("retention pruned {deleted} snapshots"),
            Err(e) => error!("retention pruning failed: {e}"),
        }
    }
}
