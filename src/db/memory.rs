// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.
//!
//! Uniqueness rules use `DashMap` entry locks, so insert-if-absent is atomic
//! per key just like a create-only Firestore write.

use super::{collections, Store};
use crate::error::AppError;
use crate::models::{AccessRequest, AccessRequestStatus, Session, User, WhitelistEntry};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// In-memory document store.
#[derive(Default)]
pub struct InMemoryStore {
    /// Keyed by normalized email
    whitelist: DashMap<String, WhitelistEntry>,
    /// Keyed by request id
    requests: DashMap<String, AccessRequest>,
    /// Normalized email -> id of its pending request
    pending_emails: DashMap<String, String>,
    /// Keyed by normalized email
    users: DashMap<String, User>,
    /// Keyed by token hash
    sessions: DashMap<String, Session>,
    /// Collections currently failing every call (outage simulation)
    unavailable: DashSet<&'static str>,
    /// Delay added to every call, in milliseconds
    latency_ms: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call touching `collection` fail with a transient error
    /// until called again with `false`.
    pub fn simulate_outage(&self, collection: &'static str, unavailable: bool) {
        if unavailable {
            self.unavailable.insert(collection);
        } else {
            self.unavailable.remove(collection);
        }
    }

    /// Delay every call by `latency` (slow backend simulation).
    pub fn simulate_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::Relaxed);
    }

    async fn check(&self, collection: &'static str) -> Result<(), AppError> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.contains(collection) {
            return Err(AppError::Transient(format!("{} unavailable", collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    // ─── Whitelist ───────────────────────────────────────────────

    async fn insert_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<bool, AppError> {
        self.check(collections::WHITELIST).await?;
        match self.whitelist.entry(entry.email.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(true)
            }
        }
    }

    async fn get_whitelist_entry(&self, id: &str) -> Result<Option<WhitelistEntry>, AppError> {
        self.check(collections::WHITELIST).await?;
        Ok(self
            .whitelist
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.value().clone()))
    }

    async fn find_whitelist_entry_by_email(
        &self,
        email: &str,
    ) -> Result<Option<WhitelistEntry>, AppError> {
        self.check(collections::WHITELIST).await?;
        Ok(self.whitelist.get(email).map(|e| e.value().clone()))
    }

    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>, AppError> {
        self.check(collections::WHITELIST).await?;
        Ok(self.whitelist.iter().map(|e| e.value().clone()).collect())
    }

    async fn update_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<(), AppError> {
        self.check(collections::WHITELIST).await?;
        match self.whitelist.get_mut(&entry.email) {
            Some(mut existing) => {
                *existing = entry.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Whitelist entry {} not found",
                entry.id
            ))),
        }
    }

    async fn delete_whitelist_entry(&self, id: &str) -> Result<bool, AppError> {
        self.check(collections::WHITELIST).await?;
        let email = self
            .whitelist
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.key().clone());
        Ok(match email {
            Some(email) => self.whitelist.remove(&email).is_some(),
            None => false,
        })
    }

    // ─── Access Requests ─────────────────────────────────────────

    async fn insert_pending_request(&self, request: &AccessRequest) -> Result<bool, AppError> {
        self.check(collections::ACCESS_REQUESTS).await?;
        match self.pending_emails.entry(request.email.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                self.requests.insert(request.id.clone(), request.clone());
                slot.insert(request.id.clone());
                Ok(true)
            }
        }
    }

    async fn get_access_request(&self, id: &str) -> Result<Option<AccessRequest>, AppError> {
        self.check(collections::ACCESS_REQUESTS).await?;
        Ok(self.requests.get(id).map(|r| r.value().clone()))
    }

    async fn list_access_requests(
        &self,
        status: Option<AccessRequestStatus>,
    ) -> Result<Vec<AccessRequest>, AppError> {
        self.check(collections::ACCESS_REQUESTS).await?;
        Ok(self
            .requests
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn complete_access_request(&self, request: &AccessRequest) -> Result<bool, AppError> {
        self.check(collections::ACCESS_REQUESTS).await?;
        let Some(mut stored) = self.requests.get_mut(&request.id) else {
            return Ok(false);
        };
        if stored.status != AccessRequestStatus::Pending {
            return Ok(false);
        }
        *stored = request.clone();
        drop(stored);

        self.pending_emails
            .remove_if(&request.email, |_, pending_id| pending_id == &request.id);
        Ok(true)
    }

    async fn delete_access_request(&self, id: &str) -> Result<bool, AppError> {
        self.check(collections::ACCESS_REQUESTS).await?;
        let Some((_, removed)) = self.requests.remove(id) else {
            return Ok(false);
        };
        self.pending_emails
            .remove_if(&removed.email, |_, pending_id| pending_id == id);
        Ok(true)
    }

    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.check(collections::USERS).await?;
        Ok(self
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.value().clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.check(collections::USERS).await?;
        Ok(self.users.get(email).map(|u| u.value().clone()))
    }

    async fn insert_user(&self, user: &User) -> Result<bool, AppError> {
        self.check(collections::USERS).await?;
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(true)
            }
        }
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        self.check(collections::USERS).await?;
        match self.users.get_mut(&user.email) {
            Some(mut existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {} not found", user.id))),
        }
    }

    // ─── Sessions ────────────────────────────────────────────────

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.check(collections::SESSIONS).await?;
        self.sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> Result<Option<Session>, AppError> {
        self.check(collections::SESSIONS).await?;
        Ok(self.sessions.get(token_hash).map(|s| s.value().clone()))
    }

    async fn update_session(&self, session: &Session) -> Result<(), AppError> {
        self.check(collections::SESSIONS).await?;
        if let Some(mut existing) = self.sessions.get_mut(&session.token_hash) {
            *existing = session.clone();
        }
        Ok(())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), AppError> {
        self.check(collections::SESSIONS).await?;
        self.sessions.remove(token_hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, email: &str) -> AccessRequest {
        AccessRequest {
            id: id.to_string(),
            full_name: "Alice".to_string(),
            email: email.to_string(),
            unit_number: "1A".to_string(),
            mobile: None,
            status: AccessRequestStatus::Pending,
            reviewed_by: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[tokio::test]
    async fn test_pending_slot_is_released_on_completion() {
        let store = InMemoryStore::new();
        assert!(store.insert_pending_request(&request("r1", "a@ex.com")).await.unwrap());
        assert!(!store.insert_pending_request(&request("r2", "a@ex.com")).await.unwrap());

        let mut done = request("r1", "a@ex.com");
        done.status = AccessRequestStatus::Rejected;
        assert!(store.complete_access_request(&done).await.unwrap());
        // Second completion sees a terminal state
        assert!(!store.complete_access_request(&done).await.unwrap());

        assert!(store.insert_pending_request(&request("r3", "a@ex.com")).await.unwrap());
    }

    #[tokio::test]
    async fn test_outage_simulation() {
        let store = InMemoryStore::new();
        store.simulate_outage(collections::SESSIONS, true);
        assert!(matches!(
            store.get_session("x").await,
            Err(AppError::Transient(_))
        ));
        store.simulate_outage(collections::SESSIONS, false);
        assert!(store.get_session("x").await.unwrap().is_none());
    }
}
