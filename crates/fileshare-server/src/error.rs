use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fileshare_index::IndexError;
use serde_json::json;

/// Application error type that converts to HTTP responses
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Index(IndexError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Index(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, "File not found".into())
            }
            AppError::Index(e) => {
                tracing::error!(error = %e, "Storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        AppError::Index(e)
    }
}
