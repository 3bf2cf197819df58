//! Submission client: hands a validated form to the generation backend
//! (LLM summary + PDF rendering) and returns where the artifact lives.
//!
//! Two implementations, chosen at startup:
//! - `HttpSubmissionBackend` posts to `{SUBMISSION_BACKEND_URL}/api/generate`
//! - `FixtureSubmissionBackend` answers from a canned JSON fixture

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::CollaboratorError;
use crate::models::record::AggregateRecord;
use crate::models::repository::RepositorySummary;

pub mod fixture;

const GENERATE_PATH: &str = "/api/generate";
const MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// What the backend receives: the form plus the summaries of every
/// selected repository, flattened.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub form_data: AggregateRecord,
    pub repositories: Vec<RepositorySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryCategory {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub success: bool,
    #[serde(default)]
    pub pdf_url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub repository_categories: Vec<RepositoryCategory>,
}

#[async_trait]
pub trait SubmissionBackend: Send + Sync {
    /// "http" | "fixture", for logs.
    fn name(&self) -> &'static str;

    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResult, CollaboratorError>;
}

/// Network-backed submission.
/// Retries transport failures, 429 and 5xx with exponential backoff.
/// A timeout is returned immediately: the backend may still be generating.
#[derive(Clone)]
pub struct HttpSubmissionBackend {
    client: Client,
    endpoint: String,
    backoff: Duration,
}

impl HttpSubmissionBackend {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build submission HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}{GENERATE_PATH}", base_url.trim_end_matches('/')),
            backoff: DEFAULT_BACKOFF,
        })
    }

    #[cfg(test)]
    fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl SubmissionBackend for HttpSubmissionBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResult, CollaboratorError> {
        let mut last_error: Option<CollaboratorError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                // 1x, 2x, 4x the base delay
                let delay = self.backoff * (1 << (attempt - 1));
                warn!(
                    "Submission attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&self.endpoint).json(request).send().await {
                Ok(r) => r,
                Err(e) => {
                    let err = CollaboratorError::from(e);
                    if matches!(err, CollaboratorError::Timeout) {
                        return Err(err);
                    }
                    last_error = Some(err);
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Submission backend returned {}: {}", status, body);
                last_error = Some(CollaboratorError::Backend {
                    status: status.as_u16(),
                    message: error_message(&body),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CollaboratorError::Backend {
                    status: status.as_u16(),
                    message: error_message(&body),
                });
            }

            let result: SubmissionResult = response
                .json()
                .await
                .map_err(|e| CollaboratorError::Decode(e.to_string()))?;

            if !result.success {
                return Err(CollaboratorError::Rejected(
                    "The generation backend reported a failure".to_string(),
                ));
            }

            debug!(
                "Submission succeeded: pdf_url={}, categories={}",
                result.pdf_url,
                result.repository_categories.len()
            );
            return Ok(result);
        }

        Err(last_error.unwrap_or(CollaboratorError::Network(
            "no submission attempt was made".to_string(),
        )))
    }
}

/// Pulls `error` or `message` out of a JSON error body, else returns it raw.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}
