// crates/pocopi-server/src/error.rs
// ============================================================================
// Module: API Errors
// Description: HTTP error mapping for PoCoPI endpoints.
// Purpose: Render every failure as `{statusCode, message, error}`.
// Dependencies: axum, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! Client errors carry a single human-readable message. Internal errors are
//! logged with their detail and rendered with a generic message so storage
//! paths and I/O details never reach clients.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::validation::ValidationErrors;

// ============================================================================
// SECTION: API Error
// ============================================================================

/// Generic message rendered for internal failures.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Endpoint failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed validation.
    #[error("{0}")]
    BadRequest(String),
    /// Referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Request body exceeds the configured limit.
    #[error("request body exceeds the configured limit")]
    PayloadTooLarge,
    /// Unexpected server-side failure; detail is logged, never rendered.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the wire body for the error.
    fn body(&self) -> ErrorBody {
        let status = self.status();
        let message = match self {
            Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            status_code: status.as_u16(),
            message,
            error: status.canonical_reason(),
        }
    }
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// HTTP status code.
    status_code: u16,
    /// Human-readable message.
    message: String,
    /// Status reason phrase.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::BadRequest(errors.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::InvalidKey(key) => Self::BadRequest(format!("{key} is not a valid user id")),
            other => Self::Internal(other.to_string()),
        }
    }
}
