//! Periodic garbage collection task
//!
//! The storage index exposes a single idempotent `collect()`; this module
//! owns the schedule. A failed pass is logged and never cancels the next run.

use fileshare_index::StorageIndex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::warn;

/// Spawn the collection loop. The first scheduled pass runs one full
/// interval after spawn; the eager startup pass is the caller's job.
pub fn spawn_collector(index: Arc<StorageIndex>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // the first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = index.collect().await {
                warn!(error = %e, "scheduled garbage collection failed");
            }
        }
    })
}
