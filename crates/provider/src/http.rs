//! HTTP client for task-id/polling generation proxy APIs.
//!
//! Speaks the proxy wire shape used by the upstream generation gateway:
//! `POST /api/generate` to start a job, `GET /api/task/{id}` to poll it,
//! `POST /api/task/{id}/cancel` to request cancellation. Implemented with
//! [`reqwest`]; HTTP-level outcomes are classified into the trait's
//! transient/definitive split here so the orchestrator never inspects
//! status codes.

use async_trait::async_trait;
use serde::Deserialize;

use demoforge_core::task::MediaKind;
use demoforge_core::types::Timestamp;

use crate::provider::{
    GenerationProvider, ProviderRequest, ProviderStatusReport, ProviderSubmission,
    ProviderTaskState, TransientError,
};

/// Connection settings for an HTTP generation provider.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Base HTTP URL of the proxy, e.g. `http://localhost:5000`.
    pub api_url: String,
    /// Model identifier sent for image requests.
    pub image_model: String,
    /// Model identifier sent for video requests.
    pub video_model: String,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            image_model: "wan2.6-image".to_string(),
            video_model: "wan2.2-kf2v-flash".to_string(),
        }
    }
}

/// HTTP client for a single generation proxy instance.
pub struct HttpGenerationProvider {
    client: reqwest::Client,
    config: HttpProviderConfig,
}

/// Response returned by `/api/generate` and `/api/task/{id}`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    status: Option<String>,
    task_id: Option<String>,
    error: Option<String>,
    result: Option<GenerateResult>,
    expires_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
struct GenerateResult {
    url: Option<String>,
    urls: Option<Vec<String>>,
}

impl GenerateResult {
    /// First artifact URL, whichever field the proxy populated.
    fn first_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or_else(|| self.urls.as_ref().and_then(|u| u.first()).map(String::as_str))
    }
}

impl HttpGenerationProvider {
    /// Create a new provider client.
    pub fn new(config: HttpProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a provider client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across providers).
    pub fn with_client(client: reqwest::Client, config: HttpProviderConfig) -> Self {
        Self { client, config }
    }

    fn model_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.config.image_model,
            MediaKind::Video => &self.config.video_model,
        }
    }

    // ---- private helpers ----

    /// Split a response into the transient/definitive classification:
    /// 5xx and 429 are transient, any other non-2xx is a definitive
    /// rejection carrying the body text.
    async fn classify(
        response: reqwest::Response,
    ) -> Result<Result<GenerateResponse, String>, TransientError> {
        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(TransientError(format!(
                "provider returned {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Ok(Err(format!("provider returned {status}: {body}")));
        }
        let parsed = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| TransientError(format!("invalid provider response body: {e}")))?;
        Ok(Ok(parsed))
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    fn name(&self) -> &str {
        "http-proxy"
    }

    async fn submit(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderSubmission, TransientError> {
        let body = serde_json::json!({
            "model": self.model_for(request.kind),
            "prompt": request.prompt,
            "reference_image_url": request.reference_url,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.config.api_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransientError(e.to_string()))?;

        let parsed = match Self::classify(response).await? {
            Ok(parsed) => parsed,
            Err(message) => return Ok(ProviderSubmission::Rejected { message }),
        };

        if let Some(error) = parsed.error {
            return Ok(ProviderSubmission::Rejected { message: error });
        }
        if parsed.status.as_deref() == Some("completed") {
            if let Some(url) = parsed.result.as_ref().and_then(GenerateResult::first_url) {
                return Ok(ProviderSubmission::Completed {
                    result_url: url.to_string(),
                    expires_at: parsed.expires_at,
                });
            }
            return Ok(ProviderSubmission::Rejected {
                message: "provider reported completion without a result URL".to_string(),
            });
        }
        if let Some(task_id) = parsed.task_id {
            return Ok(ProviderSubmission::Accepted { task_id });
        }

        Err(TransientError(
            "provider response carried neither a task id nor a result".to_string(),
        ))
    }

    async fn status(&self, task_id: &str) -> Result<ProviderStatusReport, TransientError> {
        let response = self
            .client
            .get(format!("{}/api/task/{task_id}", self.config.api_url))
            .send()
            .await
            .map_err(|e| TransientError(e.to_string()))?;

        let parsed = match Self::classify(response).await? {
            Ok(parsed) => parsed,
            // The provider no longer knows the task. Not transient.
            Err(message) => {
                return Ok(ProviderStatusReport {
                    state: ProviderTaskState::Failed,
                    result_url: None,
                    error: Some(message),
                    expires_at: None,
                })
            }
        };

        let report = match parsed.status.as_deref() {
            Some("completed") => {
                let result_url = parsed
                    .result
                    .as_ref()
                    .and_then(GenerateResult::first_url)
                    .map(str::to_string);
                ProviderStatusReport {
                    state: ProviderTaskState::Completed,
                    result_url,
                    error: None,
                    expires_at: parsed.expires_at,
                }
            }
            Some("error") | Some("failed") => ProviderStatusReport {
                state: ProviderTaskState::Failed,
                result_url: None,
                error: parsed.error.or_else(|| Some("generation failed".to_string())),
                expires_at: None,
            },
            Some("queued") => ProviderStatusReport {
                state: ProviderTaskState::Queued,
                result_url: None,
                error: None,
                expires_at: None,
            },
            // "processing" and anything else the proxy invents.
            _ => ProviderStatusReport {
                state: ProviderTaskState::Running,
                result_url: None,
                error: None,
                expires_at: None,
            },
        };

        Ok(report)
    }

    async fn cancel(&self, task_id: &str) -> Result<(), TransientError> {
        let response = self
            .client
            .post(format!("{}/api/task/{task_id}/cancel", self.config.api_url))
            .send()
            .await
            .map_err(|e| TransientError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransientError(format!(
                "cancel returned {status}: {body}"
            )));
        }
        Ok(())
    }
}
