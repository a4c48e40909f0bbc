//! Liveness endpoints.
//!
//! Neither route touches the store or the cache; backend reachability is
//! reported by the `*-connection-check` methods instead.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Create liveness routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(greeting))
        .route("/health", get(health_check))
}

/// GET / - Plain-text greeting.
async fn greeting() -> &'static str {
    "Hello World"
}

/// GET /health - Process is up and serving.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
