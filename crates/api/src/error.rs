use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use migplan_core::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and implements [`IntoResponse`] to produce consistent
/// JSON error responses. Internal race-resolution signals
/// (`InvalidTransition`) and infrastructure failures are sanitized to 500s;
/// they are never client-meaningful.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `migplan_core`.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Core(core) = self;
        let (status, code, message) = match &core {
            CoreError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Task not found".to_string(),
            ),
            CoreError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            CoreError::InvalidTransition { .. } => {
                // Never a client-visible outcome; the dispatcher/worker
                // resolve completion races internally.
                tracing::warn!(error = %core, "Completion race surfaced to the HTTP layer");
                internal()
            }
            CoreError::EnqueueFailed { .. }
            | CoreError::StoreUnavailable(_)
            | CoreError::QueueUnavailable(_)
            | CoreError::Internal(_) => {
                tracing::error!(error = %core, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
