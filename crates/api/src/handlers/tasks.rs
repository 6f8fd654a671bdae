//! Handlers for the generation task registry.
//!
//! Routes:
//! - `GET  /tasks`                    -- registry snapshot (debugging/replay)
//! - `GET  /tasks/{task_id}`          -- poll a task
//! - `POST /tasks/{task_id}/cancel`   -- cancel a task
//! - `GET  /tasks/{task_id}/artifact` -- fetch the artifact URL

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use demoforge_core::task::GenerationTask;
use demoforge_provider::orchestrator::TaskOrchestrator;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// A task record plus the advisory retry delay for the caller's next poll.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: GenerationTask,
    /// Present after transient polling failures; callers should wait this
    /// long before the next poll.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
}

impl TaskResponse {
    pub fn new(task: GenerationTask, orchestrator: &TaskOrchestrator) -> Self {
        let retry_delay_ms = orchestrator
            .suggested_retry_delay(&task)
            .map(|d| d.as_millis() as u64);
        Self {
            task,
            retry_delay_ms,
        }
    }
}

/// GET /api/v1/tasks
///
/// Snapshot of every tracked task, ordered by submission time.
pub async fn list(State(state): State<AppState>) -> Json<DataResponse<Vec<GenerationTask>>> {
    let tasks = state.orchestrator.registry_snapshot().await;
    Json(DataResponse { data: tasks })
}

/// GET /api/v1/tasks/{task_id}
///
/// Polls the provider for the task's current status. Task-level failures
/// are reported on the record, never as an HTTP error; only an unknown
/// task id produces a 404.
pub async fn poll(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<DataResponse<TaskResponse>>> {
    let task = state.orchestrator.poll(&task_id).await?;
    Ok(Json(DataResponse {
        data: TaskResponse::new(task, &state.orchestrator),
    }))
}

/// POST /api/v1/tasks/{task_id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<DataResponse<TaskResponse>>> {
    let task = state.orchestrator.cancel(&task_id).await?;
    Ok(Json(DataResponse {
        data: TaskResponse::new(task, &state.orchestrator),
    }))
}

#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    pub result_url: String,
}

/// GET /api/v1/tasks/{task_id}/artifact
///
/// Serves the artifact URL only while its validity window holds; past the
/// window this returns 410 and the task flips to `expired`.
pub async fn artifact(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<DataResponse<ArtifactResponse>>> {
    let result_url = state.orchestrator.artifact_url(&task_id).await?;
    Ok(Json(DataResponse {
        data: ArtifactResponse { result_url },
    }))
}
