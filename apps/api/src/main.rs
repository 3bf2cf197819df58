mod backend_client;
mod config;
mod db;
mod errors;
mod form;
mod github;
mod models;
mod persistence;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend_client::fixture::FixtureSubmissionBackend;
use crate::backend_client::{HttpSubmissionBackend, SubmissionBackend};
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::form::orchestrator::FormContext;
use crate::form::sessions::FormSessions;
use crate::github::fixture::FixtureRepositorySource;
use crate::github::{GitHubRepositorySource, RepositorySource};
use crate::persistence::memory::InMemoryRecordStore;
use crate::persistence::postgres_store::PostgresRecordStore;
use crate::persistence::redis_store::RedisRecordStore;
use crate::persistence::{FormPersistence, RecordStore};
use crate::routes::build_router;
use crate::state::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Builder API v{}", env!("CARGO_PKG_VERSION"));

    let persistence = FormPersistence::new(session_store(&config)?, durable_store(&config).await?);

    let ctx = FormContext {
        persistence,
        submitter: submission_backend(&config)?,
        repositories: repository_source(&config)?,
    };

    let sessions = FormSessions::new(ctx, Duration::from_secs(config.session_ttl_secs));
    sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL);

    let state = AppState {
        sessions,
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis when configured, else an in-process map (lost on restart).
fn session_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Session store: Redis (ttl {}s)", config.session_ttl_secs);
            Ok(Arc::new(RedisRecordStore::new(client, config.session_ttl_secs)))
        }
        None => {
            warn!("REDIS_URL not set; session snapshots kept in memory");
            Ok(Arc::new(InMemoryRecordStore::new("session")))
        }
    }
}

/// PostgreSQL when configured, else an in-process map.
async fn durable_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            ensure_schema(&pool).await?;
            info!("Durable store: PostgreSQL");
            Ok(Arc::new(PostgresRecordStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set; durable snapshots kept in memory");
            Ok(Arc::new(InMemoryRecordStore::new("durable")))
        }
    }
}

fn submission_backend(config: &Config) -> Result<Arc<dyn SubmissionBackend>> {
    let backend: Arc<dyn SubmissionBackend> = match config.submission_backend_url() {
        Some(url) => Arc::new(HttpSubmissionBackend::new(
            url,
            Duration::from_secs(config.submission_timeout_secs),
        )?),
        None => Arc::new(
            FixtureSubmissionBackend::new().with_delay(Duration::from_millis(config.mock_delay_ms)),
        ),
    };
    info!("Submission backend: {}", backend.name());
    Ok(backend)
}

fn repository_source(config: &Config) -> Result<Arc<dyn RepositorySource>> {
    let source: Arc<dyn RepositorySource> = match &config.github_token {
        Some(token) => Arc::new(GitHubRepositorySource::new(
            &config.github_api_url,
            token.clone(),
        )?),
        None => Arc::new(FixtureRepositorySource),
    };
    info!("Repository source: {}", source.name());
    Ok(source)
}
