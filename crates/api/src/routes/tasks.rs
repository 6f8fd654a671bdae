//! Route definitions for the `/tasks` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list))
        .route("/{task_id}", get(tasks::poll))
        .route("/{task_id}/cancel", post(tasks::cancel))
        .route("/{task_id}/artifact", get(tasks::artifact))
}
