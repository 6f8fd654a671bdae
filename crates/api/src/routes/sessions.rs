//! Route definitions for the `/sessions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{generation, session};
use crate::state::AppState;

/// Routes mounted at `/sessions`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(session::create))
        .route("/{id}/consistency", get(session::get_consistency))
        .route("/{id}/updates", post(session::apply_updates))
        .route(
            "/{id}/subjects/{subject_id}/reference",
            post(generation::request_reference),
        )
        .route(
            "/{id}/reference-tasks/{task_id}",
            get(generation::check_reference),
        )
        .route("/{id}/generate-video", post(generation::generate_video))
}
