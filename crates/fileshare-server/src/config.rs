use std::env;
use std::path::PathBuf;

/// Server configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub storage_dir: PathBuf,
    pub public_url: String,
    pub api_prefix: String,
    pub gc_interval_secs: u64,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let storage_dir = env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage"));

        let public_url =
            env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let api_prefix = env::var("API_PREFIX")
            .map(|p| normalize_prefix(&p))
            .unwrap_or_default();

        let gc_interval_secs = env::var("GC_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(64 * 1024 * 1024); // 64 MiB default

        Self {
            port,
            storage_dir,
            public_url,
            api_prefix,
            gc_interval_secs,
            max_upload_bytes,
        }
    }

    /// Path of the record database, one level under the storage directory.
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join("index.db")
    }

    /// Root of the blob store, one level under the storage directory.
    pub fn blob_root(&self) -> PathBuf {
        self.storage_dir.join("files")
    }
}

/// An empty prefix stays empty; anything else gets a single leading slash
/// and no trailing one.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
