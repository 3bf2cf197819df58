//! Repository list: the signed-in user's GitHub repositories, each
//! enriched with its language breakdown and README-derived tags.
//!
//! `GitHubRepositorySource` talks to the GitHub REST API;
//! `FixtureRepositorySource` serves a canned list for local development.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::CollaboratorError;
use crate::models::repository::RepositorySummary;

pub mod fixture;
pub mod readme_tags;

use readme_tags::derive_readme_tags;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait RepositorySource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, CollaboratorError>;
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    id: u64,
    name: String,
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    topics: Vec<String>,
    html_url: String,
    #[serde(default)]
    stargazers_count: u32,
    #[serde(default)]
    forks_count: u32,
}

#[derive(Clone)]
pub struct GitHubRepositorySource {
    client: Client,
    api_url: String,
    token: String,
}

impl GitHubRepositorySource {
    pub fn new(api_url: &str, token: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build GitHub HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.api_url))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
    }

    async fn fetch_repos(&self) -> Result<Vec<GitHubRepo>, CollaboratorError> {
        let response = self.get("/user/repos?per_page=100&sort=updated").send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))
    }

    async fn fetch_languages(
        &self,
        full_name: &str,
    ) -> Result<BTreeMap<String, u64>, CollaboratorError> {
        let response = self
            .get(&format!("/repos/{full_name}/languages"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Raw README text; a repository without one yields an empty string.
    async fn fetch_readme(&self, full_name: &str) -> Result<String, CollaboratorError> {
        let response = self
            .get(&format!("/repos/{full_name}/readme"))
            .header(header::ACCEPT, "application/vnd.github.raw")
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(String::new());
        }
        Ok(response.error_for_status()?.text().await?)
    }

    /// Language and README failures degrade to empty values for that repository.
    async fn enrich(&self, repo: GitHubRepo) -> RepositorySummary {
        let languages = self
            .fetch_languages(&repo.full_name)
            .await
            .unwrap_or_else(|e| {
                warn!("Languages for {} unavailable: {e}", repo.full_name);
                BTreeMap::new()
            });
        let readme = self.fetch_readme(&repo.full_name).await.unwrap_or_else(|e| {
            warn!("README for {} unavailable: {e}", repo.full_name);
            String::new()
        });

        RepositorySummary {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            private: repo.private,
            topics: repo.topics,
            languages,
            readme_tags: derive_readme_tags(&readme),
            html_url: repo.html_url,
            stargazers_count: repo.stargazers_count,
            forks_count: repo.forks_count,
        }
    }
}

#[async_trait]
impl RepositorySource for GitHubRepositorySource {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, CollaboratorError> {
        let repos = self.fetch_repos().await?;
        let count = repos.len();

        let mut tasks = JoinSet::new();
        for (index, repo) in repos.into_iter().enumerate() {
            let source = self.clone();
            tasks.spawn(async move { (index, source.enrich(repo).await) });
        }

        let mut enriched: Vec<(usize, RepositorySummary)> = Vec::with_capacity(count);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(item) => enriched.push(item),
                Err(e) => warn!("Repository enrichment task failed: {e}"),
            }
        }
        enriched.sort_by_key(|(index, _)| *index);

        info!("Fetched {} GitHub repositories", enriched.len());
        Ok(enriched.into_iter().map(|(_, repo)| repo).collect())
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fake_github() -> Router {
        Router::new()
            .route(
                "/user/repos",
                get(|headers: HeaderMap| async move {
                    let authorized = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer test-token");
                    if !authorized {
                        return (StatusCode::UNAUTHORIZED, "Bad credentials").into_response();
                    }
                    Json(json!([
                        {
                            "id": 1, "name": "tiny-db", "full_name": "ada/tiny-db",
                            "description": "KV store", "private": false, "topics": ["storage"],
                            "html_url": "https://github.com/ada/tiny-db",
                            "stargazers_count": 5, "forks_count": 1
                        },
                        {
                            "id": 2, "name": "notes", "full_name": "ada/notes",
                            "description": null, "private": true,
                            "html_url": "https://github.com/ada/notes"
                        }
                    ]))
                    .into_response()
                }),
            )
            .route(
                "/repos/:owner/:repo/languages",
                get(|Path((_, repo)): Path<(String, String)>| async move {
                    if repo == "tiny-db" {
                        Json(json!({"Rust": 9000})).into_response()
                    } else {
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    }
                }),
            )
            .route(
                "/repos/:owner/:repo/readme",
                get(|Path((_, repo)): Path<(String, String)>| async move {
                    if repo == "tiny-db" {
                        "# tiny-db\nBuilt with Rust and Tokio.".into_response()
                    } else {
                        StatusCode::NOT_FOUND.into_response()
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_lists_and_enriches_in_order() {
        let base = serve(fake_github()).await;
        let source = GitHubRepositorySource::new(&base, "test-token".to_string()).unwrap();

        let repos = source.list_repositories().await.unwrap();
        assert_eq!(repos.len(), 2);

        assert_eq!(repos[0].name, "tiny-db");
        assert_eq!(repos[0].languages.get("Rust"), Some(&9000));
        assert_eq!(repos[0].readme_tags, vec!["Rust", "Tokio"]);

        assert_eq!(repos[1].name, "notes");
        assert!(repos[1].private);
        assert!(repos[1].languages.is_empty());
        assert!(repos[1].readme_tags.is_empty());
    }

    #[tokio::test]
    async fn test_bad_token_surfaces_backend_error() {
        let base = serve(fake_github()).await;
        let source = GitHubRepositorySource::new(&base, "wrong".to_string()).unwrap();

        let err = source.list_repositories().await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Backend { status: 401, .. }));
    }
}
