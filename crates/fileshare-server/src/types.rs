//! Wire types for the file share HTTP API

use serde::{Deserialize, Serialize};

/// Response to a successful upload. Field names are part of the public API
/// and match earlier deployments of the service.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub uuid: String,
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub records: i64,
}
