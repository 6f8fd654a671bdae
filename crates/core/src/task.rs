//! Generation task records and their status state machine.
//!
//! A [`GenerationTask`] tracks one asynchronous provider job from
//! submission to a terminal state. Transitions only ever move forward:
//! `pending -> running -> succeeded | failed | expired | canceled`, with
//! `succeeded -> expired` as the single time-driven move between terminal
//! states. All transition methods take `&mut self` and reject anything
//! else with a [`CoreError::Conflict`], so callers cannot corrupt a record
//! by replaying stale updates.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Hard prompt limit for still-image submissions. Generous: reference
/// prompts carry full detail.
pub const IMAGE_PROMPT_LIMIT: usize = 4_000;

/// Hard prompt limit for video submissions, matching the assembler budget.
pub const VIDEO_PROMPT_LIMIT: usize = 800;

/// Hours an artifact URL stays valid after success when the provider
/// supplies no explicit expiry.
pub const DEFAULT_ARTIFACT_TTL_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Media kinds a provider can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// The prompt character limit enforced at submission for this kind.
    pub fn prompt_limit(self) -> usize {
        match self {
            MediaKind::Image => IMAGE_PROMPT_LIMIT,
            MediaKind::Video => VIDEO_PROMPT_LIMIT,
        }
    }
}

/// Lifecycle status of a generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created, submission in flight.
    Pending,
    /// Provider acknowledged the job; awaiting completion.
    Running,
    Succeeded,
    Failed,
    /// The artifact existed but its URL outlived its validity window.
    Expired,
    Canceled,
}

impl TaskStatus {
    /// Whether this status is final. `pending` and `running` are the only
    /// non-terminal states.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Expired => "expired",
            TaskStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task failed. Callers use this to decide between a retry button
/// and a hard failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider rejected the input. Not transient; never retried.
    InvalidInput,
    /// The provider explicitly reported the job as failed.
    Provider,
    /// Transient polling errors exceeded the retry budget.
    RetriesExhausted,
}

/// A recorded task failure with its distinguishable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// One outstanding or completed provider job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationTask {
    /// Opaque identifier. Provider-assigned once a submission is
    /// acknowledged; locally generated for tasks rejected at submission so
    /// the failed record stays addressable.
    pub task_id: String,
    pub kind: MediaKind,
    pub status: TaskStatus,
    pub submitted_at: Timestamp,
    /// Consecutive transient polling failures. Reset by any successful
    /// provider status response.
    pub attempt_count: u32,
    /// Set exactly once, on success. Mutually exclusive with `error`.
    pub result_url: Option<String>,
    /// Set exactly once, on failure. Mutually exclusive with `result_url`.
    pub error: Option<TaskFailure>,
    /// Deadline after which `result_url` must no longer be served.
    pub expires_at: Option<Timestamp>,
}

impl GenerationTask {
    /// Create a new task in `pending`.
    pub fn new(task_id: String, kind: MediaKind, now: Timestamp) -> Self {
        Self {
            task_id,
            kind,
            status: TaskStatus::Pending,
            submitted_at: now,
            attempt_count: 0,
            result_url: None,
            error: None,
            expires_at: None,
        }
    }

    /// Record provider acknowledgement. Idempotent while running.
    pub fn mark_running(&mut self) -> Result<(), CoreError> {
        match self.status {
            TaskStatus::Pending | TaskStatus::Running => {
                self.status = TaskStatus::Running;
                Ok(())
            }
            other => Err(self.frozen(other)),
        }
    }

    /// Record success with the artifact URL and its validity deadline.
    pub fn complete(&mut self, result_url: String, expires_at: Timestamp) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(self.frozen(self.status));
        }
        self.status = TaskStatus::Succeeded;
        self.result_url = Some(result_url);
        self.expires_at = Some(expires_at);
        Ok(())
    }

    /// Record failure with a distinguishable reason.
    pub fn fail(&mut self, failure: TaskFailure) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(self.frozen(self.status));
        }
        self.status = TaskStatus::Failed;
        self.error = Some(failure);
        Ok(())
    }

    /// Record caller-requested cancellation. Only legal while non-terminal.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(self.frozen(self.status));
        }
        self.status = TaskStatus::Canceled;
        Ok(())
    }

    /// Flip `succeeded` to `expired` when the validity window has elapsed.
    ///
    /// Purely time-driven; returns whether the status changed. Safe to call
    /// from any state on every read.
    pub fn check_expiry(&mut self, now: Timestamp) -> bool {
        if self.status == TaskStatus::Succeeded
            && self.expires_at.is_some_and(|deadline| now >= deadline)
        {
            self.status = TaskStatus::Expired;
            return true;
        }
        false
    }

    /// Read the artifact URL, enforcing the validity window.
    ///
    /// Callers should run [`GenerationTask::check_expiry`] first so the
    /// status flip is persisted; this method re-checks regardless and never
    /// serves a stale URL.
    pub fn artifact_url(&self, now: Timestamp) -> Result<&str, CoreError> {
        match self.status {
            TaskStatus::Succeeded => {
                if self.expires_at.is_some_and(|deadline| now >= deadline) {
                    return Err(self.expired_error(now));
                }
                self.result_url.as_deref().ok_or_else(|| {
                    CoreError::Internal(format!(
                        "Task {} succeeded without a result URL",
                        self.task_id
                    ))
                })
            }
            TaskStatus::Expired => Err(self.expired_error(now)),
            other => Err(CoreError::Conflict(format!(
                "Task {} has no artifact (status {other})",
                self.task_id
            ))),
        }
    }

    // ---- private helpers ----

    fn frozen(&self, status: TaskStatus) -> CoreError {
        CoreError::Conflict(format!(
            "Task {} is already terminal ({status})",
            self.task_id
        ))
    }

    fn expired_error(&self, now: Timestamp) -> CoreError {
        CoreError::ExpiredArtifact {
            task_id: self.task_id.clone(),
            expired_at: self.expires_at.unwrap_or(now),
        }
    }
}

/// Validate a prompt for submission: non-empty and within the
/// kind-specific limit.
pub fn validate_prompt(prompt: &str, kind: MediaKind) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation(
            "Prompt must not be empty".to_string(),
        ));
    }
    let limit = kind.prompt_limit();
    let length = prompt.chars().count();
    if length > limit {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {limit} characters for {kind:?} (got {length})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
