//! Dispatch of `POST /test/implementation` requests.

use bson::doc;
use docbridge_engine::{Reply, Request};

use crate::error::{AppError, Result};
use crate::AppState;

/// Run `request` through the dispatcher.
///
/// Store and cache calls block, so dispatch runs on the blocking pool. When
/// request logging is enabled, an audit record is queued on the detached
/// write pool whatever the outcome.
pub async fn handle_implementation(state: &AppState, request: Request) -> Result<Reply> {
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(%request_id, method = %request.method, "Dispatching request");

    let dispatcher = state.dispatcher.clone();
    let method = request.method.clone();
    let result = match tokio::task::spawn_blocking(move || dispatcher.dispatch(&request)).await {
        Ok(outcome) => outcome.map_err(AppError::from),
        Err(e) => Err(AppError::Internal(format!("dispatch task failed: {e}"))),
    };

    if state.config.request_logging {
        state
            .dispatcher
            .services()
            .db
            .request_logs()
            .insert_on_thread(
                doc! {
                    "request_id": request_id.as_str(),
                    "method": method.as_str(),
                    "succeeded": result.is_ok(),
                    "created_at": bson::DateTime::now(),
                }
                .into(),
            );
    }

    match &result {
        Ok(reply) => tracing::debug!(%request_id, status = ?reply.status, "Request handled"),
        Err(e) => tracing::info!(%request_id, %method, "Request failed: {}", e),
    }

    result
}
