// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whitelist-gated login and session issuance.
//!
//! Sessions use sliding expiration: each successful lookup pushes the expiry
//! forward by the configured TTL. Expired sessions are deleted on lookup.

use crate::crypto::{generate_session_token, hash_session_token};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::email::local_part;
use crate::models::{normalize_email, Role, Session, User};
use crate::services::WhitelistService;
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use validator::ValidateEmail;

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    /// Opaque token the client stores and presents on later requests
    pub session_id: String,
}

/// Login, session lookup and admin provisioning.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn Store>,
    whitelist: WhitelistService,
    ttl: chrono::Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn Store>, whitelist: WhitelistService, ttl: chrono::Duration) -> Self {
        Self {
            store,
            whitelist,
            ttl,
        }
    }

    /// Sign in with an email address.
    ///
    /// Allowed if the email has an active whitelist entry or belongs to a
    /// provisioned admin; anything else is [`AppError::AccessDenied`].
    pub async fn login_with_email(&self, email: &str) -> Result<LoginOutcome> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::AccessDenied);
        }

        let user = match self.whitelist.is_whitelisted(&email).await? {
            Some(entry) => {
                let name = entry
                    .name
                    .unwrap_or_else(|| local_part(&email).to_string());
                self.upsert_login_user(&email, &name).await?
            }
            None => match self.store.get_user_by_email(&email).await? {
                Some(user) if user.is_admin() => self.record_login(user).await?,
                _ => {
                    tracing::info!(email = %email, "Login denied: not whitelisted");
                    return Err(AppError::AccessDenied);
                }
            },
        };

        let session_id = self.issue_session(&user).await?;

        tracing::info!(
            user_id = %user.id,
            email = %user.email,
            role = ?user.role,
            "Login successful"
        );
        Ok(LoginOutcome { user, session_id })
    }

    /// Resolve a session token to its user.
    ///
    /// Empty or missing tokens, unknown tokens and expired sessions all
    /// resolve to `None`; only store failures are errors.
    pub async fn get_current_user(&self, session_id: Option<&str>) -> Result<Option<User>> {
        let Some(token) = session_id.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let token_hash = hash_session_token(token);

        let Some(mut session) = self.store.get_session(&token_hash).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if session.is_expired_at(now) {
            tracing::debug!(user_id = %session.user_id, "Session expired");
            self.store.delete_session(&token_hash).await?;
            return Ok(None);
        }

        let Some(user) = self.store.get_user(&session.user_id).await? else {
            tracing::warn!(user_id = %session.user_id, "Session bound to missing user");
            self.store.delete_session(&token_hash).await?;
            return Ok(None);
        };

        session.last_seen_at = format_utc_rfc3339(now);
        session.expires_at = format_utc_rfc3339(self.expiry_from(now)?);
        if let Err(e) = self.store.update_session(&session).await {
            // The user still resolves; only the expiry slide is lost
            tracing::warn!(user_id = %user.id, error = %e, "Failed to extend session");
        }

        Ok(Some(user))
    }

    /// Invalidate a session. Unknown or empty tokens are not an error.
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        let token = session_id.trim();
        if token.is_empty() {
            return Ok(());
        }
        self.store.delete_session(&hash_session_token(token)).await?;
        tracing::info!("Session invalidated");
        Ok(())
    }

    /// Provision an admin account outside the whitelist flow.
    ///
    /// This is the only path that produces `Role::Admin`. An existing user
    /// with this email is promoted.
    pub async fn create_admin_user(&self, email: &str, name: &str) -> Result<String> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(AppError::BadRequest(format!("Invalid email address: {:?}", email)));
        }
        let name = match name.trim() {
            "" => local_part(&email).to_string(),
            trimmed => trimmed.to_string(),
        };

        let now = now_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
            name,
            role: Role::Admin,
            last_login_at: None,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        if self.store.insert_user(&user).await? {
            tracing::info!(user_id = %user.id, email = %email, "Admin user provisioned");
            return Ok(user.id);
        }

        let mut existing = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Database(format!("User {} vanished during provisioning", email)))?;
        if !existing.is_admin() {
            existing.role = Role::Admin;
            existing.updated_at = now;
            self.store.update_user(&existing).await?;
            tracing::info!(user_id = %existing.id, email = %email, "User promoted to admin");
        }
        Ok(existing.id)
    }

    /// Create the user on first login, or stamp `last_login_at` on an
    /// existing one. The role is never changed here.
    async fn upsert_login_user(&self, email: &str, name: &str) -> Result<User> {
        if let Some(existing) = self.store.get_user_by_email(email).await? {
            return self.record_login(existing).await;
        }

        let now = now_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role: Role::User,
            last_login_at: Some(now.clone()),
            created_at: now.clone(),
            updated_at: now,
        };

        if self.store.insert_user(&user).await? {
            tracing::info!(user_id = %user.id, email, "User created on first login");
            return Ok(user);
        }

        // Lost a race with a concurrent first login
        let existing = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Database(format!("User {} vanished during login", email)))?;
        self.record_login(existing).await
    }

    async fn record_login(&self, mut user: User) -> Result<User> {
        let now = now_rfc3339();
        user.last_login_at = Some(now.clone());
        user.updated_at = now;
        self.store.update_user(&user).await?;
        Ok(user)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_add_signed(self.ttl).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session TTL {} out of range", self.ttl))
        })
    }

    async fn issue_session(&self, user: &User) -> Result<String> {
        let token = generate_session_token()?;
        let now = Utc::now();
        let session = Session {
            token_hash: hash_session_token(&token),
            user_id: user.id.clone(),
            created_at: format_utc_rfc3339(now),
            expires_at: format_utc_rfc3339(self.expiry_from(now)?),
            last_seen_at: format_utc_rfc3339(now),
        };
        self.store.insert_session(&session).await?;
        Ok(token)
    }
}
