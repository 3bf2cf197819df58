use async_trait::async_trait;

use crate::errors::CollaboratorError;
use crate::github::RepositorySource;
use crate::models::repository::RepositorySummary;

const REPOSITORIES_FIXTURE: &str = include_str!("../../fixtures/repositories.json");

/// Canned repository list, already enriched.
#[derive(Debug, Clone, Default)]
pub struct FixtureRepositorySource;

#[async_trait]
impl RepositorySource for FixtureRepositorySource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, CollaboratorError> {
        serde_json::from_str(REPOSITORIES_FIXTURE)
            .map_err(|e| CollaboratorError::Decode(e.to_string()))
    }
}
