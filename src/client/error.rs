// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Errors seen by API clients.

use std::fmt;

/// Failure kind reported by the API's `error` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    AccessDenied,
    AlreadyRegistered,
    DuplicatePendingRequest,
    DuplicateEmail,
    NotFound,
    InvalidStateTransition,
    Unauthorized,
    Forbidden,
    BadRequest,
    /// Database or internal error on the server
    Server,
    /// A code this client does not know
    Unknown,
}

impl ApiErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "access_denied" => ApiErrorKind::AccessDenied,
            "already_registered" => ApiErrorKind::AlreadyRegistered,
            "duplicate_pending_request" => ApiErrorKind::DuplicatePendingRequest,
            "duplicate_email" => ApiErrorKind::DuplicateEmail,
            "not_found" => ApiErrorKind::NotFound,
            "invalid_state_transition" => ApiErrorKind::InvalidStateTransition,
            "unauthorized" => ApiErrorKind::Unauthorized,
            "forbidden" => ApiErrorKind::Forbidden,
            "bad_request" => ApiErrorKind::BadRequest,
            "database_error" | "internal_error" => ApiErrorKind::Server,
            _ => ApiErrorKind::Unknown,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Client-side error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a typed failure.
    #[error("{kind} ({status}): {details}")]
    Api {
        kind: ApiErrorKind,
        status: u16,
        details: String,
    },

    /// Timeout, connection failure or 503; safe to retry.
    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// The API failure kind, if the server produced one.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            ClientError::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transient(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            // Timeouts, refused connections and dropped bodies are all retryable
            ClientError::Transient(e.to_string())
        }
    }
}
