//! Two-tier error handling.
//!
//! [`SocialError`] carries the full internal detail and is what every component returns.
//! At the HTTP boundary it is collapsed into an [`ErrorCode`] through an explicit mapping
//! table, and only the code plus a generic message reach the client. The detail is logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Missing or invalid user identity")]
    Unauthenticated,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Store operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl SocialError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SocialError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        SocialError::InvalidOperation(reason.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SocialError::NotFound { .. } => ErrorCode::NotFound,
            SocialError::Unauthenticated => ErrorCode::Unauthenticated,
            SocialError::InvalidOperation(_) => ErrorCode::InvalidOperation,
            SocialError::Timeout { .. } => ErrorCode::InternalError,
            SocialError::Store(_) => ErrorCode::InternalError,
        }
    }

    /// Message safe to show to a client.
    pub fn public_message(&self) -> String {
        match self {
            SocialError::NotFound { entity, .. } => format!("{} not found", entity),
            SocialError::InvalidOperation(reason) => reason.clone(),
            _ => self.code().default_message().to_string(),
        }
    }
}

/// Error codes exposed to clients. Duplicate likes and follows succeed as no-ops,
/// so no conflict code exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Unauthenticated,
    InvalidOperation,
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::InvalidOperation => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not found",
            ErrorCode::Unauthenticated => "authentication required",
            ErrorCode::InvalidOperation => "invalid operation",
            ErrorCode::InternalError => "internal server error",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for SocialError {
    fn into_response(self) -> Response {
        let code = self.code();
        match code {
            ErrorCode::InternalError => error!("Request failed: {}", self),
            _ => debug!("Request rejected: {}", self),
        }
        let body = ErrorBody {
            code,
            message: self.public_message(),
        };
        (code.status(), Json(body)).into_response()
    }
}
