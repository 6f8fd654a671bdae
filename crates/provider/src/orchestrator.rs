//! Task lifecycle orchestration for asynchronous generation jobs.
//!
//! [`TaskOrchestrator`] owns the registry of [`GenerationTask`] records. It
//! validates and submits generation requests, exposes polling as an
//! explicit caller-driven operation (no internal scheduler), applies
//! bounded retry accounting for transient provider errors, and enforces
//! the artifact validity window on every read.
//!
//! Locking: a single `RwLock` around the registry. Provider calls are made
//! without holding the lock; their outcomes are applied under the write
//! lock through the forward-only transition methods on the task. Updates
//! to one task are therefore totally ordered, while polls for different
//! tasks proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use demoforge_core::backoff::{self, BackoffConfig, DEFAULT_MAX_POLL_RETRIES};
use demoforge_core::error::CoreError;
use demoforge_core::task::{
    self, FailureKind, GenerationTask, MediaKind, TaskFailure, TaskStatus,
    DEFAULT_ARTIFACT_TTL_HOURS,
};
use demoforge_core::types::Timestamp;

use crate::provider::{
    GenerationProvider, ProviderRequest, ProviderStatusReport, ProviderSubmission,
    ProviderTaskState,
};

/// Tunable parameters for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Consecutive transient polling failures tolerated before a task is
    /// failed with a retries-exhausted reason.
    pub max_poll_retries: u32,
    /// Backoff parameters behind [`TaskOrchestrator::suggested_retry_delay`].
    pub backoff: BackoffConfig,
    /// Artifact validity window applied when the provider reports no
    /// explicit expiry.
    pub artifact_ttl: chrono::Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_poll_retries: DEFAULT_MAX_POLL_RETRIES,
            backoff: BackoffConfig::default(),
            artifact_ttl: chrono::Duration::hours(DEFAULT_ARTIFACT_TTL_HOURS),
        }
    }
}

/// Errors raised by orchestrator operations.
///
/// Task-level failures (provider errors, exhausted retries) are recorded on
/// the task record instead; only structural misuse and pre-submission
/// problems surface here.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Submission never reached the provider. No task was created
    /// provider-side, so retrying the submission is safe and idempotent.
    #[error("Transient submission failure: {0}")]
    TransientSubmission(String),

    /// The task id is not in the registry.
    #[error("Task {0} not found")]
    UnknownTask(String),

    /// `cancel` was called on a task that already reached a terminal state.
    /// The record is left unchanged.
    #[error("Task {task_id} is already terminal ({status})")]
    TerminalTask { task_id: String, status: TaskStatus },
}

/// Manages the lifecycle of generation tasks against one provider.
///
/// Created once at startup; the `Arc` is cheaply cloned into request
/// handlers and per-session managers.
pub struct TaskOrchestrator {
    provider: Arc<dyn GenerationProvider>,
    /// Task registry indexed by task id.
    tasks: RwLock<HashMap<String, GenerationTask>>,
    config: OrchestratorConfig,
}

impl TaskOrchestrator {
    pub fn new(provider: Arc<dyn GenerationProvider>, config: OrchestratorConfig) -> Self {
        Self {
            provider,
            tasks: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Submit a generation request.
    ///
    /// The prompt is validated before any provider contact: an empty or
    /// over-limit prompt fails with a validation error and no task record
    /// is created. A provider-side input rejection returns a task already
    /// in `failed` (malformed input is not transient, so it is never
    /// retried). A transport failure during submission raises
    /// [`OrchestratorError::TransientSubmission`]; no task exists
    /// provider-side, so the caller may retry freely.
    pub async fn submit(
        &self,
        prompt: &str,
        kind: MediaKind,
        reference_url: Option<String>,
    ) -> Result<GenerationTask, OrchestratorError> {
        task::validate_prompt(prompt, kind)?;

        let request = ProviderRequest {
            prompt: prompt.to_string(),
            kind,
            reference_url,
        };
        let submission = self
            .provider
            .submit(&request)
            .await
            .map_err(|e| OrchestratorError::TransientSubmission(e.to_string()))?;

        let now = Utc::now();
        let task = match submission {
            ProviderSubmission::Accepted { task_id } => {
                let mut task = GenerationTask::new(task_id, kind, now);
                task.mark_running()?;
                tracing::info!(
                    task_id = %task.task_id,
                    provider = self.provider.name(),
                    kind = ?kind,
                    "Generation task accepted",
                );
                task
            }
            ProviderSubmission::Completed {
                result_url,
                expires_at,
            } => {
                let mut task = GenerationTask::new(Uuid::new_v4().to_string(), kind, now);
                task.complete(result_url, self.deadline(expires_at, now))?;
                tracing::info!(
                    task_id = %task.task_id,
                    provider = self.provider.name(),
                    "Generation completed synchronously",
                );
                task
            }
            ProviderSubmission::Rejected { message } => {
                let mut task = GenerationTask::new(Uuid::new_v4().to_string(), kind, now);
                task.fail(TaskFailure {
                    kind: FailureKind::InvalidInput,
                    message: message.clone(),
                })?;
                tracing::warn!(
                    task_id = %task.task_id,
                    error = %message,
                    "Provider rejected generation input",
                );
                task
            }
        };

        self.tasks
            .write()
            .await
            .insert(task.task_id.clone(), task.clone());
        Ok(task)
    }

    /// Poll a task's status. Idempotent and safe to call repeatedly.
    ///
    /// Terminal tasks are returned unchanged without contacting the
    /// provider. Transient provider errors are counted on the task rather
    /// than raised; once the consecutive-failure budget is exhausted the
    /// task fails with a retries-exhausted reason. Only an unknown task id
    /// raises.
    pub async fn poll(&self, task_id: &str) -> Result<GenerationTask, OrchestratorError> {
        {
            let now = Utc::now();
            let mut tasks = self.tasks.write().await;
            let task = Self::lookup(&mut tasks, task_id)?;
            if task.check_expiry(now) {
                tracing::info!(task_id, "Artifact validity window elapsed");
            }
            if task.status.is_terminal() {
                return Ok(task.clone());
            }
        }

        // Query the provider without holding the registry lock.
        let report = self.provider.status(task_id).await;

        let now = Utc::now();
        let mut tasks = self.tasks.write().await;
        let task = Self::lookup(&mut tasks, task_id)?;
        if task.status.is_terminal() {
            // A concurrent caller drove the task to completion meanwhile.
            return Ok(task.clone());
        }

        match report {
            Ok(report) => {
                task.attempt_count = 0;
                apply_report(task, report, now, self.config.artifact_ttl)?;
            }
            Err(e) => {
                task.attempt_count += 1;
                tracing::warn!(
                    task_id,
                    attempt = task.attempt_count,
                    error = %e,
                    "Transient polling failure",
                );
                if task.attempt_count >= self.config.max_poll_retries {
                    task.fail(TaskFailure {
                        kind: FailureKind::RetriesExhausted,
                        message: format!(
                            "{} consecutive transient polling failures, last: {e}",
                            task.attempt_count
                        ),
                    })?;
                }
            }
        }

        Ok(task.clone())
    }

    /// Cancel a task. Only legal while `pending` or `running`.
    ///
    /// Orchestrator-side bookkeeping is updated first; the provider is then
    /// notified best-effort (the remote job is not guaranteed to stop).
    /// Calling cancel on a terminal task returns
    /// [`OrchestratorError::TerminalTask`] and leaves the record unchanged.
    pub async fn cancel(&self, task_id: &str) -> Result<GenerationTask, OrchestratorError> {
        let task = {
            let mut tasks = self.tasks.write().await;
            let task = Self::lookup(&mut tasks, task_id)?;
            if task.status.is_terminal() {
                return Err(OrchestratorError::TerminalTask {
                    task_id: task_id.to_string(),
                    status: task.status,
                });
            }
            task.cancel()?;
            task.clone()
        };
        tracing::info!(task_id, "Generation task canceled");

        if let Err(e) = self.provider.cancel(task_id).await {
            tracing::warn!(task_id, error = %e, "Best-effort provider cancellation failed");
        }
        Ok(task)
    }

    /// Read a task's current record without contacting the provider.
    /// Applies the time-driven expiry check.
    pub async fn get(&self, task_id: &str) -> Result<GenerationTask, OrchestratorError> {
        let now = Utc::now();
        let mut tasks = self.tasks.write().await;
        let task = Self::lookup(&mut tasks, task_id)?;
        task.check_expiry(now);
        Ok(task.clone())
    }

    /// Read a succeeded task's artifact URL, enforcing the validity window.
    ///
    /// Past `expires_at` this fails with an expired-artifact error and the
    /// task's status flips to `expired`; a stale URL is never served.
    pub async fn artifact_url(&self, task_id: &str) -> Result<String, OrchestratorError> {
        let now = Utc::now();
        let mut tasks = self.tasks.write().await;
        let task = Self::lookup(&mut tasks, task_id)?;
        if task.check_expiry(now) {
            tracing::info!(task_id, "Artifact validity window elapsed");
        }
        let url = task.artifact_url(now)?;
        Ok(url.to_string())
    }

    /// Snapshot of every tracked task, for debugging and replay. Ordered
    /// by submission time, then task id.
    pub async fn registry_snapshot(&self) -> Vec<GenerationTask> {
        let now = Utc::now();
        let mut tasks = self.tasks.write().await;
        let mut snapshot: Vec<GenerationTask> = tasks
            .values_mut()
            .map(|task| {
                task.check_expiry(now);
                task.clone()
            })
            .collect();
        snapshot.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        snapshot
    }

    /// Advisory delay before the caller's next poll, derived from the
    /// task's consecutive transient-failure count. `None` when polling is
    /// on the regular cadence.
    pub fn suggested_retry_delay(&self, task: &GenerationTask) -> Option<Duration> {
        if task.status.is_terminal() || task.attempt_count == 0 {
            return None;
        }
        Some(backoff::retry_delay(task.attempt_count, &self.config.backoff))
    }

    // ---- private helpers ----

    fn lookup<'a>(
        tasks: &'a mut HashMap<String, GenerationTask>,
        task_id: &str,
    ) -> Result<&'a mut GenerationTask, OrchestratorError> {
        tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::UnknownTask(task_id.to_string()))
    }

    fn deadline(&self, provider_expiry: Option<Timestamp>, now: Timestamp) -> Timestamp {
        provider_expiry.unwrap_or(now + self.config.artifact_ttl)
    }
}

/// Apply a provider status report to a non-terminal task.
fn apply_report(
    task: &mut GenerationTask,
    report: ProviderStatusReport,
    now: Timestamp,
    artifact_ttl: chrono::Duration,
) -> Result<(), OrchestratorError> {
    match report.state {
        ProviderTaskState::Completed => match report.result_url {
            Some(url) => {
                let deadline = report.expires_at.unwrap_or(now + artifact_ttl);
                task.complete(url, deadline)?;
                tracing::info!(task_id = %task.task_id, "Generation task succeeded");
            }
            None => {
                task.fail(TaskFailure {
                    kind: FailureKind::Provider,
                    message: "provider reported completion without a result URL".to_string(),
                })?;
            }
        },
        ProviderTaskState::Failed => {
            let message = report
                .error
                .unwrap_or_else(|| "generation failed".to_string());
            tracing::warn!(task_id = %task.task_id, error = %message, "Generation task failed");
            task.fail(TaskFailure {
                kind: FailureKind::Provider,
                message,
            })?;
        }
        ProviderTaskState::Queued | ProviderTaskState::Running => {
            task.mark_running()?;
        }
    }
    Ok(())
}
