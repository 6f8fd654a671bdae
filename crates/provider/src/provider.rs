//! The provider trait boundary.
//!
//! A generation provider is an opaque service that accepts a prompt (plus
//! an optional reference image) and asynchronously produces a media
//! artifact behind an opaque task id. Definitive outcomes (accepted,
//! completed, rejected, failed) travel in the `Ok` values; the error
//! channel is reserved for transient transport failures, which are always
//! safe to retry.

use async_trait::async_trait;

use demoforge_core::task::MediaKind;
use demoforge_core::types::Timestamp;

/// A generation request as sent to a provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub prompt: String,
    pub kind: MediaKind,
    /// Reference image URL grounding the generation in a subject's
    /// established appearance.
    pub reference_url: Option<String>,
}

/// Immediate outcome of a submission.
#[derive(Debug, Clone)]
pub enum ProviderSubmission {
    /// The provider queued the job behind an opaque task id.
    Accepted { task_id: String },
    /// The provider completed synchronously. Common for still images.
    Completed {
        result_url: String,
        expires_at: Option<Timestamp>,
    },
    /// The provider rejected the input outright. Not transient; retrying
    /// the same input cannot succeed.
    Rejected { message: String },
}

/// Where the provider says a task currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderTaskState {
    Queued,
    Running,
    Completed,
    Failed,
}

/// A provider's answer to a status query.
#[derive(Debug, Clone)]
pub struct ProviderStatusReport {
    pub state: ProviderTaskState,
    pub result_url: Option<String>,
    pub error: Option<String>,
    /// Validity deadline for the artifact URL, when the provider reports one.
    pub expires_at: Option<Timestamp>,
}

/// Transport-level failure reaching the provider: network errors,
/// timeouts, 5xx responses, rate limiting. Always retryable.
#[derive(Debug, thiserror::Error)]
#[error("Transient provider failure: {0}")]
pub struct TransientError(pub String);

/// An asynchronous media generation service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name identifier, used in logs.
    fn name(&self) -> &str;

    /// Start a generation job.
    async fn submit(&self, request: &ProviderRequest)
        -> Result<ProviderSubmission, TransientError>;

    /// Query the current status of a job.
    async fn status(&self, task_id: &str) -> Result<ProviderStatusReport, TransientError>;

    /// Best-effort cancellation. The remote job is not guaranteed to stop.
    async fn cancel(&self, task_id: &str) -> Result<(), TransientError>;
}
