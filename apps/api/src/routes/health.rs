use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let backend = if state.config.submission_backend_url().is_some() {
        "http"
    } else {
        "fixture"
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-builder-api",
        "submission_backend": backend,
        "active_sessions": state.sessions.len().await,
    }))
}
