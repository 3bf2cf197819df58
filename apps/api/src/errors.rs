use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::form::orchestrator::{FormError, SubmitError};
use crate::form::validation::SubmissionIssue;

/// Failure talking to an external collaborator (generation backend, GitHub).
/// Never corrupts the in-progress record; always safe to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Backend error (status {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl CollaboratorError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::Network(_) | CollaboratorError::Timeout => true,
            CollaboratorError::Backend { status, .. } => *status == 429 || *status >= 500,
            CollaboratorError::Rejected(_) | CollaboratorError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CollaboratorError::Timeout
        } else if e.is_decode() {
            CollaboratorError::Decode(e.to_string())
        } else {
            CollaboratorError::Network(e.to_string())
        }
    }
}

const COLLABORATOR_MESSAGE: &str =
    "An external service failed. Your form is saved; please try again.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Submission blocked by {} issue(s)", .0.len())]
    SubmissionBlocked(Vec<SubmissionIssue>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        match e {
            FormError::EntryNotFound(_)
            | FormError::ItemNotFound { .. }
            | FormError::RepositoryNotFound(_) => AppError::NotFound(e.to_string()),
            FormError::Image(rejection) => AppError::Validation(rejection.to_string()),
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Invalid(issues) => AppError::SubmissionBlocked(issues),
            SubmitError::NotOnFinalSection | SubmitError::AlreadyPending => {
                AppError::Conflict(e.to_string())
            }
            SubmitError::Collaborator(inner) => AppError::Collaborator(inner),
        }
    }
}

// Extractor rejections carry axum's own plain-text message; wrap it in the envelope.
macro_rules! rejection_as_validation {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::Validation(rejection.body_text())
                }
            }
        )+
    };
}

rejection_as_validation!(
    QueryRejection,
    PathRejection,
    JsonRejection,
    MultipartRejection
);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::SubmissionBlocked(issues) => {
                let body = Json(json!({
                    "error": {
                        "code": "SUBMISSION_BLOCKED",
                        "message": "Please fix the listed issues before generating",
                        "issues": issues,
                    }
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Collaborator(e) => {
                tracing::error!("Collaborator error: {e}");
                let body = Json(json!({
                    "error": {
                        "code": "COLLABORATOR_ERROR",
                        "message": COLLABORATOR_MESSAGE,
                        "retryable": e.is_retryable(),
                    }
                }));
                return (StatusCode::BAD_GATEWAY, body).into_response();
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
