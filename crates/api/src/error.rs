use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use demoforge_core::error::CoreError;
use demoforge_provider::orchestrator::OrchestratorError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`OrchestratorError`] for
/// generation-task errors. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `demoforge-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A task orchestration error from `demoforge-provider`.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core(core),

            AppError::Orchestrator(err) => match err {
                OrchestratorError::Core(core) => classify_core(core),
                OrchestratorError::TransientSubmission(msg) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "TRANSIENT_SUBMISSION",
                    format!("Submission failed transiently, retry is safe: {msg}"),
                ),
                OrchestratorError::UnknownTask(id) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Task {id} not found"),
                ),
                OrchestratorError::TerminalTask { task_id, status } => (
                    StatusCode::CONFLICT,
                    "TERMINAL_TASK",
                    format!("Task {task_id} is already terminal ({status})"),
                ),
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a [`CoreError`] into an HTTP status, error code, and message.
fn classify_core(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::ExpiredArtifact { task_id, expired_at } => (
            StatusCode::GONE,
            "EXPIRED_ARTIFACT",
            format!("Artifact for task {task_id} expired at {expired_at}; regenerate it"),
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
