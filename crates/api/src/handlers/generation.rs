//! Handlers for reference-image and video generation.
//!
//! Routes:
//! - `POST /sessions/{id}/subjects/{subject_id}/reference` -- request a
//!   reference image for a subject
//! - `GET  /sessions/{id}/reference-tasks/{task_id}`       -- poll a
//!   reference task (writes the URL back on success)
//! - `POST /sessions/{id}/generate-video`                  -- assemble a
//!   video prompt and submit a video task

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use demoforge_core::assembler;
use demoforge_core::task::{MediaKind, TaskStatus};

use crate::error::{AppError, AppResult};
use crate::handlers::session::resolve_session;
use crate::handlers::tasks::TaskResponse;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReferenceRequest {
    /// Pose override for the reference shot (e.g. "front-facing, neutral
    /// expression"). Falls back to the subject's stored pose hint.
    pub pose: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub task_id: String,
    pub status: TaskStatus,
    /// Present when the provider completed synchronously; otherwise poll
    /// the reference task until it does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

/// POST /api/v1/sessions/{id}/subjects/{subject_id}/reference
pub async fn request_reference(
    State(state): State<AppState>,
    Path((id, subject_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<ReferenceRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ReferenceResponse>>)> {
    let session = resolve_session(&state, id).await?;
    let task = session
        .references
        .request_reference(subject_id, input.pose.as_deref())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: ReferenceResponse {
                task_id: task.task_id.clone(),
                status: task.status,
                result_url: task.result_url,
            },
        }),
    ))
}

/// GET /api/v1/sessions/{id}/reference-tasks/{task_id}
pub async fn check_reference(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(Uuid, String)>,
) -> AppResult<Json<DataResponse<TaskResponse>>> {
    let session = resolve_session(&state, id).await?;
    let task = session.references.check_reference(&task_id).await?;
    Ok(Json(DataResponse {
        data: TaskResponse::new(task, &state.orchestrator),
    }))
}

fn default_include_environment() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct GenerateVideoRequest {
    /// Subjects to include, in any order; the assembler ranks them by
    /// confidence.
    pub subject_ids: Vec<Uuid>,
    #[serde(default = "default_include_environment")]
    pub include_environment: bool,
}

/// POST /api/v1/sessions/{id}/generate-video
///
/// Assembles the compressed video prompt for the given subjects and
/// submits a video generation task. The lead subject's reference image
/// (when one has been generated) is attached to ground the clip.
pub async fn generate_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<GenerateVideoRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TaskResponse>>)> {
    if input.subject_ids.is_empty() {
        return Err(AppError::BadRequest(
            "subject_ids must not be empty".to_string(),
        ));
    }

    let session = resolve_session(&state, id).await?;
    let (prompt, reference_url) = {
        let store = session.store.read().await;
        let consistency = store.state();
        let prompt = assembler::assemble_video_prompt(
            consistency,
            &input.subject_ids,
            input.include_environment,
        );
        let reference_url = input.subject_ids.iter().find_map(|sid| {
            consistency
                .subject_by_id(*sid)
                .and_then(|s| s.reference_image_url.clone())
        });
        (prompt, reference_url)
    };

    let task = state
        .orchestrator
        .submit(&prompt, MediaKind::Video, reference_url)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: TaskResponse::new(task, &state.orchestrator),
        }),
    ))
}
