//! HTTP endpoints for the file share
//!
//! Provides /health, PUT /upload/{lifetime}, and GET /download/{id}.

use crate::error::AppError;
use crate::types::{HealthResponse, UploadResponse};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};
use fileshare_index::StorageIndex;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared state for the HTTP server
pub struct ServerState {
    pub index: Arc<StorageIndex>,
    pub public_url: String,
    pub api_prefix: String,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(index: Arc<StorageIndex>, public_url: String, api_prefix: String) -> Self {
        Self {
            index,
            public_url,
            api_prefix,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router, nested under the configured API prefix
pub fn create_router(state: SharedState, max_upload_bytes: usize) -> Router {
    let prefix = state.api_prefix.clone();
    let router = Router::new()
        .route("/health", get(health))
        .route("/upload/{lifetime}", put(upload))
        .route("/download/{id}", get(download))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state);
    if prefix.is_empty() {
        router
    } else {
        Router::new().nest(&prefix, router)
    }
}

/// Start the HTTP server; serves until interrupted, then closes the index
pub async fn start_server(
    state: SharedState,
    port: u16,
    max_upload_bytes: usize,
) -> std::io::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_with_shutdown(state, listener, max_upload_bytes, shutdown_signal()).await
}

/// Serve until `shutdown` resolves, then release the storage index so no
/// in-flight handle outlives the record store connection.
pub async fn serve_with_shutdown<F>(
    state: SharedState,
    listener: tokio::net::TcpListener,
    max_upload_bytes: usize,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let router = create_router(state.clone(), max_upload_bytes);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Shutting down; closing storage index");
    state.index.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install interrupt handler");
    }
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Result<Json<HealthResponse>, AppError> {
    let records = state.index.count().await?;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        records,
    }))
}

/// Accept a multipart upload and store it for `lifetime` seconds
async fn upload(
    State(state): State<SharedState>,
    Path(lifetime): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let mut reader = data.as_ref();
        let uuid = state.index.upload(lifetime, &mut reader, &name).await?;

        return Ok(Json(UploadResponse {
            url: format!("{}{}/download/{}", state.public_url, state.api_prefix, uuid),
            uuid,
            success: true,
        }));
    }

    Err(AppError::BadRequest("missing 'file' field".to_string()))
}

/// Serve a stored file as an attachment
async fn download(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let descriptor = state.index.get(&id).await?;
    let data = state.index.read_content(&descriptor.id).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", sanitize_name(&descriptor.name)),
        )
        .body(Body::from(data))
        .unwrap()
        .into_response())
}

/// Restrict a display name to characters safe inside a quoted header value.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| *c != '"' && *c != '\\')
        .collect();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}
