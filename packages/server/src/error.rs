//! Request-level error taxonomy and its HTTP mapping.
//!
//! Downstream-node failures are never represented here: they are absorbed
//! into `ServiceOutcome` values inside the aggregated result. Only registry,
//! security, and validation failures fail a request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::registry::RegistryError;

/// Errors surfaced to API callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed query or service payload. Never retried.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Security gate rejected the credential. No registry or cache side
    /// effects have occurred.
    #[error("missing or invalid credentials")]
    Unauthorized,
    /// Credential is valid but does not own the targeted record.
    #[error("credentials do not grant access to this resource")]
    Forbidden,
    /// Unknown service id.
    #[error("{0} not found")]
    NotFound(String),
    /// Duplicate registration.
    #[error("{0}")]
    Conflict(String),
    /// Unexpected registry or cache failure. Logged; detail withheld from
    /// the response body.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref cause) = self {
            error!(error = %cause, "internal error while handling request");
        }
        let status = self.status();
        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => ApiError::NotFound("service".to_string()),
            RegistryError::Forbidden => ApiError::Forbidden,
            RegistryError::Duplicate { url, service_type } => ApiError::Conflict(format!(
                "service already registered for {url} ({service_type})"
            )),
            RegistryError::InvalidUrl(detail) => {
                ApiError::Validation(format!("invalid service url: {detail}"))
            }
            RegistryError::InvalidRecord(detail) => ApiError::Validation(detail),
            RegistryError::Store(cause) => ApiError::Internal(cause),
        }
    }
}
