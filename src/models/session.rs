// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side session record.

use crate::time_utils::parse_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A login session. The raw token is only ever held by the client;
/// the store keys sessions by the token's SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Hex SHA-256 of the opaque session token (also the document ID)
    pub token_hash: String,
    pub user_id: String,
    pub created_at: String,
    /// Sliding expiry, pushed forward on every successful lookup
    pub expires_at: String,
    pub last_seen_at: String,
}

impl Session {
    /// Expired, or carrying a timestamp we cannot read.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        parse_rfc3339(&self.expires_at)
            .map(|expires_at| expires_at <= now)
            .unwrap_or(true)
    }
}
