use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every external dependency is optional; a missing one falls back to an
/// in-process store or a fixture collaborator.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
    pub session_ttl_secs: u64,
    pub submission_backend_url: Option<String>,
    pub submission_timeout_secs: u64,
    pub use_mock_backend: bool,
    pub mock_delay_ms: u64,
    pub github_token: Option<String>,
    pub github_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            redis_url: optional_env("REDIS_URL"),
            database_url: optional_env("DATABASE_URL"),
            session_ttl_secs: parse_env("SESSION_TTL_SECS", 86_400)?,
            submission_backend_url: optional_env("SUBMISSION_BACKEND_URL"),
            submission_timeout_secs: parse_env("SUBMISSION_TIMEOUT_SECS", 90)?,
            use_mock_backend: parse_env("USE_MOCK_BACKEND", false)?,
            mock_delay_ms: parse_env("MOCK_DELAY_MS", 1_000)?,
            github_token: optional_env("GITHUB_TOKEN"),
            github_api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
        })
    }

    /// The HTTP backend is used only when a URL is set and mocking is off.
    pub fn submission_backend_url(&self) -> Option<&str> {
        if self.use_mock_backend {
            None
        } else {
            self.submission_backend_url.as_deref()
        }
    }
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' is invalid: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            redis_url: None,
            database_url: None,
            session_ttl_secs: 86_400,
            submission_backend_url: Some("http://localhost:3000".to_string()),
            submission_timeout_secs: 90,
            use_mock_backend: false,
            mock_delay_ms: 0,
            github_token: None,
            github_api_url: "https://api.github.com".to_string(),
        }
    }

    #[test]
    fn test_mock_flag_overrides_backend_url() {
        let mut config = config();
        assert_eq!(
            config.submission_backend_url(),
            Some("http://localhost:3000")
        );
        config.use_mock_backend = true;
        assert_eq!(config.submission_backend_url(), None);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("RESUME_TEST_PORT", "eighty");
        assert!(parse_env::<u16>("RESUME_TEST_PORT", 8080).is_err());
        std::env::remove_var("RESUME_TEST_PORT");
        assert_eq!(parse_env::<u16>("RESUME_TEST_PORT", 8080).unwrap(), 8080);
    }
}
