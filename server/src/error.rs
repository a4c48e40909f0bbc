//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication failed")]
    Unauthorized,

    #[error(transparent)]
    Dispatch(#[from] docbridge_engine::Error),

    #[error("malformed request body: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure body: `{status: "false", message}`.
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => {
                tracing::debug!("rejected request with a bad auth token");
                StatusCode::UNAUTHORIZED
            }
            AppError::Dispatch(e) => {
                tracing::warn!("Dispatch error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Payload(e) => {
                tracing::warn!("Payload error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            status: "false",
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
