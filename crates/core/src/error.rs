use crate::types::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Artifact for task {task_id} expired at {expired_at}")]
    ExpiredArtifact {
        task_id: String,
        expired_at: Timestamp,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
