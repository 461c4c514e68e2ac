// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whitelist entry model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// An approved email address, stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WhitelistEntry {
    pub id: String,
    /// Normalized (trimmed, lowercased) email
    pub email: String,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    /// Admin email or a system source tag such as `access_request_approval`
    pub added_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for adding a single address to the whitelist.
/// The email is normalized and validated by the whitelist service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWhitelistEntry {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewWhitelistEntry {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BulkImportSummary {
    pub added: u32,
    pub skipped_duplicates: u32,
    pub failed: u32,
}
