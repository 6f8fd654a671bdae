//! Shared test harness: a scripted mock provider and an app factory.
//!
//! The mock returns pre-loaded outcomes in order, so each test controls
//! exactly what the "provider" does on every call without any network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use demoforge_api::config::ServerConfig;
use demoforge_api::router::build_app_router;
use demoforge_api::sessions::SessionManager;
use demoforge_api::state::AppState;
use demoforge_provider::orchestrator::{OrchestratorConfig, TaskOrchestrator};
use demoforge_provider::provider::{
    GenerationProvider, ProviderRequest, ProviderStatusReport, ProviderSubmission,
    ProviderTaskState, TransientError,
};

#[derive(Default)]
pub struct MockProvider {
    submissions: Mutex<VecDeque<Result<ProviderSubmission, TransientError>>>,
    statuses: Mutex<VecDeque<Result<ProviderStatusReport, TransientError>>>,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn with_accepted(self, task_id: &str) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .push_back(Ok(ProviderSubmission::Accepted {
                task_id: task_id.to_string(),
            }));
        self
    }

    pub fn with_completed_submission(self, url: &str) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .push_back(Ok(ProviderSubmission::Completed {
                result_url: url.to_string(),
                expires_at: None,
            }));
        self
    }

    pub fn with_running_status(self) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Ok(ProviderStatusReport {
                state: ProviderTaskState::Running,
                result_url: None,
                error: None,
                expires_at: None,
            }));
        self
    }

    pub fn with_completed_status(self, url: &str) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Ok(ProviderStatusReport {
                state: ProviderTaskState::Completed,
                result_url: Some(url.to_string()),
                error: None,
                expires_at: None,
            }));
        self
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(
        &self,
        _request: &ProviderRequest,
    ) -> Result<ProviderSubmission, TransientError> {
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected submit call")
    }

    async fn status(&self, _task_id: &str) -> Result<ProviderStatusReport, TransientError> {
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected status call")
    }

    async fn cancel(&self, _task_id: &str) -> Result<(), TransientError> {
        Ok(())
    }
}

/// Build the full application router around a scripted provider.
pub fn test_app(provider: MockProvider) -> Router {
    let config = ServerConfig::from_env();
    let orchestrator = Arc::new(TaskOrchestrator::new(
        Arc::new(provider) as Arc<dyn GenerationProvider>,
        OrchestratorConfig::default(),
    ));
    let state = AppState {
        config: Arc::new(config.clone()),
        sessions: Arc::new(SessionManager::new()),
        orchestrator,
    };
    build_app_router(state, &config)
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
