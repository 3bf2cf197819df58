use crate::config::Config;
use crate::form::sessions::FormSessions;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: FormSessions,
    pub config: Config,
}
