pub mod health;
pub mod sessions;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /sessions                                          create (POST)
/// /sessions/{id}/consistency                         snapshot (GET)
/// /sessions/{id}/updates                             apply extraction updates (POST)
/// /sessions/{id}/subjects/{subject_id}/reference     request reference image (POST)
/// /sessions/{id}/reference-tasks/{task_id}           poll reference task (GET)
/// /sessions/{id}/generate-video                      submit video generation (POST)
///
/// /tasks                                             registry snapshot (GET)
/// /tasks/{task_id}                                   poll (GET)
/// /tasks/{task_id}/cancel                            cancel (POST)
/// /tasks/{task_id}/artifact                          artifact URL (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/tasks", tasks::router())
}
