//! Reference image management.
//!
//! Each subject gets a canonical still image that grounds later video
//! generation. The manager assembles the full-detail reference prompt,
//! submits it as an image task, and writes the resulting artifact URL
//! back into the owning [`SubjectSheet`] -- always through the store's
//! explicit `set_reference_url` operation, never by shared mutable access.
//!
//! [`SubjectSheet`]: demoforge_core::sheets::SubjectSheet

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use demoforge_core::assembler;
use demoforge_core::error::CoreError;
use demoforge_core::store::EntityStore;
use demoforge_core::task::{GenerationTask, MediaKind, TaskStatus};

use crate::orchestrator::{OrchestratorError, TaskOrchestrator};

/// Generates and records reference images for one session's subjects.
pub struct ReferenceImageManager {
    store: Arc<RwLock<EntityStore>>,
    orchestrator: Arc<TaskOrchestrator>,
    /// Outstanding reference tasks mapped to the subject awaiting the URL.
    pending: RwLock<HashMap<String, Uuid>>,
}

impl ReferenceImageManager {
    pub fn new(store: Arc<RwLock<EntityStore>>, orchestrator: Arc<TaskOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Assemble a full-detail reference prompt for the subject and submit
    /// an image generation task.
    ///
    /// If the provider completed synchronously, the artifact URL is written
    /// back to the subject sheet before returning; otherwise the task is
    /// remembered and [`ReferenceImageManager::check_reference`] performs
    /// the write-back once the task succeeds.
    pub async fn request_reference(
        &self,
        subject_id: Uuid,
        pose: Option<&str>,
    ) -> Result<GenerationTask, OrchestratorError> {
        let prompt = {
            let store = self.store.read().await;
            assembler::assemble_reference_prompt(store.state(), subject_id, pose)?
        };

        let task = self
            .orchestrator
            .submit(&prompt, MediaKind::Image, None)
            .await?;

        match task.status {
            TaskStatus::Succeeded => self.record_reference(subject_id, &task).await?,
            status if status.is_terminal() => {}
            _ => {
                self.pending
                    .write()
                    .await
                    .insert(task.task_id.clone(), subject_id);
            }
        }
        Ok(task)
    }

    /// Poll an outstanding reference task.
    ///
    /// On success the artifact URL is written into the owning subject sheet
    /// via the store. Terminal outcomes clear the pending bookkeeping; an
    /// expired artifact is never written back.
    pub async fn check_reference(
        &self,
        task_id: &str,
    ) -> Result<GenerationTask, OrchestratorError> {
        let task = self.orchestrator.poll(task_id).await?;

        if task.status.is_terminal() {
            let subject_id = self.pending.write().await.remove(task_id);
            if task.status == TaskStatus::Succeeded {
                if let Some(subject_id) = subject_id {
                    self.record_reference(subject_id, &task).await?;
                }
            }
        }
        Ok(task)
    }

    // ---- private helpers ----

    async fn record_reference(
        &self,
        subject_id: Uuid,
        task: &GenerationTask,
    ) -> Result<(), OrchestratorError> {
        let url = task.result_url.clone().ok_or_else(|| {
            CoreError::Internal(format!(
                "Task {} succeeded without a result URL",
                task.task_id
            ))
        })?;

        let mut store = self.store.write().await;
        store.set_reference_url(subject_id, url)?;
        tracing::info!(
            %subject_id,
            task_id = %task.task_id,
            "Reference image recorded on subject sheet",
        );
        Ok(())
    }
}
