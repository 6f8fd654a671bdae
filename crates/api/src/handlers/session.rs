//! Handlers for session lifecycle and consistency state.
//!
//! Routes:
//! - `POST /sessions`                    -- create a session
//! - `GET  /sessions/{id}/consistency`   -- read-only consistency snapshot
//! - `POST /sessions/{id}/updates`       -- apply extraction updates

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use demoforge_core::error::CoreError;
use demoforge_core::extraction::ExtractedUpdate;
use demoforge_core::sheets::ConsistencyState;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::sessions::Session;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

/// POST /api/v1/sessions
pub async fn create(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<DataResponse<SessionCreated>>)> {
    let session = state.sessions.create(Arc::clone(&state.orchestrator)).await;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SessionCreated {
                session_id: session.id,
            },
        }),
    ))
}

/// GET /api/v1/sessions/{id}/consistency
pub async fn get_consistency(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<ConsistencyState>>> {
    let session = resolve_session(&state, id).await?;
    let snapshot = session.store.read().await.snapshot();
    Ok(Json(DataResponse { data: snapshot }))
}

#[derive(Debug, Deserialize)]
pub struct ApplyUpdatesRequest {
    pub updates: Vec<ExtractedUpdate>,
}

/// POST /api/v1/sessions/{id}/updates
///
/// Applies a batch of extraction updates in order and returns the updated
/// snapshot. The batch is not transactional: an invalid update fails the
/// request at that point, leaving earlier updates applied.
pub async fn apply_updates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ApplyUpdatesRequest>,
) -> AppResult<Json<DataResponse<ConsistencyState>>> {
    let session = resolve_session(&state, id).await?;
    let mut store = session.store.write().await;
    for update in input.updates {
        store.apply(update)?;
    }
    Ok(Json(DataResponse {
        data: store.snapshot(),
    }))
}

/// Resolve a session id or fail with a not-found error.
pub(crate) async fn resolve_session(state: &AppState, id: Uuid) -> Result<Arc<Session>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Session",
            id: id.to_string(),
        }))
}
