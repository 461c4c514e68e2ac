// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email normalization shared by every uniqueness check.

/// Canonical form of an email address: trimmed and lowercased.
///
/// Whitelist entries, access requests and users are all keyed on this form,
/// so `" User@Example.com"` and `"user@example.com"` are the same address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Firestore document key derived from a normalized email.
///
/// Keying documents by email makes create-only inserts the uniqueness check.
pub fn email_document_key(normalized_email: &str) -> String {
    urlencoding::encode(normalized_email).into_owned()
}

/// Local part of an address, used as a display name when nothing better exists.
pub fn local_part(normalized_email: &str) -> &str {
    normalized_email
        .split_once('@')
        .map(|(local, _)| local)
        .unwrap_or(normalized_email)
}
