//! File share server - uploads with a lifetime, downloads by identifier
//!
//! Stores uploaded files under a local directory with a SQLite index and
//! removes them after their requested lifetime via periodic collection.

mod config;
mod error;
mod gc;
mod server;
mod types;

use crate::config::Config;
use crate::server::{start_server, ServerState, SharedState};
use fileshare_index::{BlobStore, RecordStore, StorageIndex, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fileshare_server=info,fileshare_index=info".into());
    let fmt = tracing_subscriber::fmt().with_env_filter(env_filter);
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        fmt.json().init();
    } else {
        fmt.init();
    }

    let config = Config::from_env();
    info!(port = config.port, storage = %config.storage_dir.display(), "Starting file share server");

    // Parent directory must exist before the database file can be created
    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .expect("Failed to create storage directory");

    let records = RecordStore::connect(&config.database_path())
        .await
        .expect("Failed to open record store");
    let blobs = BlobStore::new(config.blob_root());
    let index = Arc::new(
        StorageIndex::new(records, blobs, Arc::new(SystemClock))
            .await
            .expect("Failed to initialize storage index"),
    );

    // Catch up on anything that expired while the service was down
    if let Err(e) = index.collect().await {
        warn!(error = %e, "startup garbage collection failed");
    }
    gc::spawn_collector(index.clone(), Duration::from_secs(config.gc_interval_secs));

    let state: SharedState = Arc::new(ServerState::new(
        index,
        config.public_url.clone(),
        config.api_prefix.clone(),
    ));

    start_server(state, config.port, config.max_upload_bytes)
        .await
        .expect("Server failed");
}
