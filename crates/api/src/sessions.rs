//! In-memory session registry.
//!
//! Each session owns one [`EntityStore`] (the only state shared between
//! the extraction flow and the generation flow) plus a
//! [`ReferenceImageManager`] that writes generated reference URLs back
//! into it. Sessions live for the process lifetime; no persistence.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use demoforge_core::store::EntityStore;
use demoforge_provider::orchestrator::TaskOrchestrator;
use demoforge_provider::reference::ReferenceImageManager;

/// One conversational session.
pub struct Session {
    pub id: Uuid,
    pub store: Arc<RwLock<EntityStore>>,
    pub references: ReferenceImageManager,
}

impl Session {
    fn new(id: Uuid, orchestrator: Arc<TaskOrchestrator>) -> Self {
        let store = Arc::new(RwLock::new(EntityStore::new(id)));
        let references = ReferenceImageManager::new(Arc::clone(&store), orchestrator);
        Self {
            id,
            store,
            references,
        }
    }
}

/// Registry of live sessions, keyed by session id.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session and return its handle.
    pub async fn create(&self, orchestrator: Arc<TaskOrchestrator>) -> Arc<Session> {
        let id = Uuid::new_v4();
        let session = Arc::new(Session::new(id, orchestrator));
        self.sessions.write().await.insert(id, Arc::clone(&session));
        tracing::info!(session_id = %id, "Session created");
        session
    }

    /// Look up a session by id.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
