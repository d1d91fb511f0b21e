//! Unified error handling for the API.
//!
//! Every error renders as JSON:
//!
//! ```json
//! { "error": "Validation failed", "fields": ["email"], "details": [...] }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use orderflow_core::{TransitionError, ValidationError};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{LifecycleError, NotifyError, ProofStoreError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Body was not valid JSON.
    #[error("Invalid JSON")]
    MalformedBody,

    /// Body exceeded the configured limit.
    #[error("Request body too large")]
    BodyTooLarge,

    /// Missing or wrong operator token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Code allocation exhausted or a concurrent update won.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Event not allowed from the order's status.
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    /// Order store failed.
    #[error("Database error: {0}")]
    Store(#[from] RepositoryError),

    /// Proof store failed.
    #[error("Proof storage error: {0}")]
    ProofStore(#[from] ProofStoreError),

    /// Email provider failed.
    #[error("Email error: {0}")]
    Notifier(#[from] NotifyError),

    /// A required integration is not configured.
    #[error("Server misconfiguration: {0}")]
    Misconfigured(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation(e) => Self::Validation(e),
            LifecycleError::NotFound(order) => Self::NotFound(format!("order {order}")),
            LifecycleError::InvalidTransition(e) => Self::InvalidTransition(e),
            LifecycleError::Conflict(reason) => Self::Conflict(reason),
            LifecycleError::Store(e) => Self::Store(e),
            LifecycleError::ProofStore(e) => Self::ProofStore(e),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MalformedBody => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::Notifier(NotifyError::Provider { status, .. }) => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Notifier(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::ProofStore(_) | Self::Misconfigured(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::ProofStore(_)
                | Self::Notifier(_)
                | Self::Misconfigured(_)
                | Self::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Validation(e) => json!({
                "error": "Validation failed",
                "fields": e.fields(),
                "details": e.errors(),
            }),
            Self::Store(_) | Self::ProofStore(_) | Self::Internal(_) => {
                json!({ "error": "Internal server error" })
            }
            Self::Misconfigured(_) => json!({ "error": "Server misconfiguration" }),
            Self::Notifier(NotifyError::Provider { body, .. }) => json!({
                "error": "Email provider error",
                "details": body,
            }),
            Self::Notifier(_) => json!({ "error": "Email provider unavailable" }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json::<Value>(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
