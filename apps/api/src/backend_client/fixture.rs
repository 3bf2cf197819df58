use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::backend_client::{SubmissionBackend, SubmissionRequest, SubmissionResult};
use crate::errors::CollaboratorError;

const GENERATE_FIXTURE: &str = include_str!("../../fixtures/generate_response.json");

/// Answers every submission with the canned generation response.
/// Counts submissions and keeps only the most recent request, so a long-running
/// server in fixture mode holds at most one record.
#[derive(Debug, Clone, Default)]
pub struct FixtureSubmissionBackend {
    delay: Duration,
    failure: Option<CollaboratorError>,
    submissions: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<SubmissionRequest>>>,
}

impl FixtureSubmissionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated generation latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[cfg(test)]
    pub fn with_failure(mut self, failure: CollaboratorError) -> Self {
        self.failure = Some(failure);
        self
    }

    #[cfg(test)]
    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub async fn last_request(&self) -> Option<SubmissionRequest> {
        self.last_request.lock().await.clone()
    }
}

#[async_trait]
impl SubmissionBackend for FixtureSubmissionBackend {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResult, CollaboratorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let count = self.submissions.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_request.lock().await = Some(request.clone());

        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        info!(
            "Fixture submission #{count} for '{}' with {} repositories",
            request.form_data.personal.full_name,
            request.repositories.len()
        );
        serde_json::from_str(GENERATE_FIXTURE)
            .map_err(|e| CollaboratorError::Decode(e.to_string()))
    }
}
