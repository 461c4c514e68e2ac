// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Services talk to the document store through [`Store`]. Each method is a
//! single atomic mutation or read; create-only inserts return `Ok(false)`
//! instead of overwriting when the key is taken.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::InMemoryStore;

use crate::error::AppError;
use crate::models::{AccessRequest, AccessRequestStatus, Session, User, WhitelistEntry};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Whitelist entries (keyed by encoded email)
    pub const WHITELIST: &str = "whitelist";
    pub const ACCESS_REQUESTS: &str = "access_requests";
    /// One marker per email with a pending request (keyed by encoded email)
    pub const PENDING_REQUEST_EMAILS: &str = "pending_request_emails";
    /// Users (keyed by encoded email)
    pub const USERS: &str = "users";
    /// Sessions (keyed by token hash)
    pub const SESSIONS: &str = "sessions";
}

/// Document store used by the access workflow.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Whitelist ───────────────────────────────────────────────

    /// Insert unless an entry with the same email exists.
    async fn insert_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<bool, AppError>;

    async fn get_whitelist_entry(&self, id: &str) -> Result<Option<WhitelistEntry>, AppError>;

    async fn find_whitelist_entry_by_email(
        &self,
        email: &str,
    ) -> Result<Option<WhitelistEntry>, AppError>;

    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>, AppError>;

    /// Overwrite an existing entry (email is immutable).
    async fn update_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<(), AppError>;

    /// Returns `false` if no entry had this id.
    async fn delete_whitelist_entry(&self, id: &str) -> Result<bool, AppError>;

    // ─── Access Requests ─────────────────────────────────────────

    /// Insert a pending request unless one is already pending for its email.
    async fn insert_pending_request(&self, request: &AccessRequest) -> Result<bool, AppError>;

    async fn get_access_request(&self, id: &str) -> Result<Option<AccessRequest>, AppError>;

    async fn list_access_requests(
        &self,
        status: Option<AccessRequestStatus>,
    ) -> Result<Vec<AccessRequest>, AppError>;

    /// Persist a terminal status if the stored request is still pending.
    ///
    /// Releases the email's pending slot. Returns `false` if the request was
    /// already moved out of `pending` by someone else.
    async fn complete_access_request(&self, request: &AccessRequest) -> Result<bool, AppError>;

    /// Returns `false` if no request had this id.
    async fn delete_access_request(&self, id: &str) -> Result<bool, AppError>;

    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert unless a user with the same email exists.
    async fn insert_user(&self, user: &User) -> Result<bool, AppError>;

    async fn update_user(&self, user: &User) -> Result<(), AppError>;

    // ─── Sessions ────────────────────────────────────────────────

    async fn insert_session(&self, session: &Session) -> Result<(), AppError>;

    async fn get_session(&self, token_hash: &str) -> Result<Option<Session>, AppError>;

    async fn update_session(&self, session: &Session) -> Result<(), AppError>;

    /// Deleting a missing session is not an error.
    async fn delete_session(&self, token_hash: &str) -> Result<(), AppError>;
}
