// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every failure kind the access workflow can produce has its own variant so
//! callers branch on the kind, never on message text. The `error` field of the
//! JSON body carries [`AppError::code`] for the same reason.

use crate::models::AccessRequestStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Login with an email that is neither whitelisted nor a provisioned admin.
    #[error("This email is not on the access list. Submit an access request and an administrator will review it.")]
    AccessDenied,

    #[error("An account already exists for {0}. Sign in instead of requesting access.")]
    AlreadyRegistered(String),

    #[error("An access request for {0} is already awaiting review.")]
    DuplicatePendingRequest(String),

    #[error("{0} is already on the whitelist")]
    DuplicateEmail(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Cannot move access request from {from} to {to}")]
    InvalidStateTransition {
        from: AccessRequestStatus,
        to: AccessRequestStatus,
    },

    /// Network failure or timeout; safe to retry.
    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Administrator access required")]
    Forbidden,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code sent as the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AccessDenied => "access_denied",
            AppError::AlreadyRegistered(_) => "already_registered",
            AppError::DuplicatePendingRequest(_) => "duplicate_pending_request",
            AppError::DuplicateEmail(_) => "duplicate_email",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidStateTransition { .. } => "invalid_state_transition",
            AppError::Transient(_) => "transient",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::BadRequest(_) => "bad_request",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AccessDenied | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::AlreadyRegistered(_)
            | AppError::DuplicatePendingRequest(_)
            | AppError::DuplicateEmail(_)
            | AppError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = match &self {
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            AppError::Transient(msg) => {
                tracing::warn!(error = %msg, "Transient failure");
                Some(self.to_string())
            }
            AppError::Unauthorized | AppError::Forbidden => None,
            _ => Some(self.to_string()),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_failures_are_distinct_from_system_errors() {
        assert_eq!(AppError::AccessDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Transient("timeout".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_ne!(AppError::AccessDenied.code(), AppError::Forbidden.code());
    }

    #[test]
    fn test_access_denied_message_points_to_access_request() {
        assert!(AppError::AccessDenied
            .to_string()
            .contains("Submit an access request"));
    }
}
