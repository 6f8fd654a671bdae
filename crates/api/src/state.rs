use std::sync::Arc;

use demoforge_provider::orchestrator::TaskOrchestrator;

use crate::config::ServerConfig;
use crate::sessions::SessionManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Live session registry (entity stores + reference managers).
    pub sessions: Arc<SessionManager>,
    /// Generation task orchestrator, shared across sessions.
    pub orchestrator: Arc<TaskOrchestrator>,
}
