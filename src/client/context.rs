// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-wide authentication context for front ends.
//!
//! Holds the current session id and the resolved user. The id is persisted
//! through a [`SessionStorage`] so it survives restarts; the user is always
//! re-resolved from the server.

use super::backend::AuthBackend;
use super::storage::{SessionStorage, SESSION_STORAGE_KEY};
use super::ClientError;
use crate::models::User;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

tokio::task_local! {
    static CURRENT_AUTH: AuthContext;
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    storage: Arc<dyn SessionStorage>,
    session: watch::Sender<Option<String>>,
    user: watch::Sender<Option<User>>,
}

/// Shared handle to the authentication state. Cheap to clone.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl AuthContext {
    /// Create the context, restoring any persisted session id.
    pub fn new(backend: Arc<dyn AuthBackend>, storage: Arc<dyn SessionStorage>) -> Self {
        let persisted = match storage.get(SESSION_STORAGE_KEY) {
            Ok(id) => id.filter(|id| !id.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session; starting logged out");
                None
            }
        };

        let (session, _) = watch::channel(persisted);
        let (user, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                backend,
                storage,
                session,
                user,
            }),
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.session.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.user.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.user.borrow().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.user.borrow().as_ref().is_some_and(User::is_admin)
    }

    /// Watch the resolved user.
    pub fn subscribe_user(&self) -> watch::Receiver<Option<User>> {
        self.inner.user.subscribe()
    }

    /// Resolve the user for the current session id.
    ///
    /// With no session id the backend is not called. A result that arrives
    /// after the session id changed is dropped. If the server no longer
    /// knows the session, the stale id is cleared from memory and storage.
    pub async fn resolve(&self) -> Result<Option<User>, ClientError> {
        let mut snapshot = None;
        self.inner.session.send_if_modified(|current| {
            snapshot = current.clone();
            if snapshot.is_none() {
                self.inner.user.send_if_modified(|user| user.take().is_some());
            }
            false
        });
        let Some(session_id) = snapshot else {
            return Ok(None);
        };

        let resolved = self.inner.backend.get_current_user(&session_id).await?;

        // Apply under the session lock so a concurrent login/logout cannot
        // interleave between the check and the writes.
        let mut applied = false;
        self.inner.session.send_if_modified(|current| {
            if current.as_deref() != Some(session_id.as_str()) {
                return false;
            }
            applied = true;
            self.inner.user.send_replace(resolved.clone());
            if resolved.is_some() {
                return false;
            }
            tracing::info!("Server no longer recognizes the session; clearing it");
            *current = None;
            self.remove_persisted();
            true
        });

        if !applied {
            tracing::debug!("Session changed during resolution; discarding result");
            return Ok(self.current_user());
        }
        Ok(resolved)
    }

    /// Re-run [`resolve`](Self::resolve) now and whenever the session id changes.
    pub fn spawn_resolver(&self) -> JoinHandle<()> {
        let ctx = self.clone();
        let mut changes = self.inner.session.subscribe();

        tokio::spawn(async move {
            loop {
                if let Err(e) = ctx.resolve().await {
                    tracing::warn!(error = %e, "Failed to resolve current user");
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Record a successful login and persist the session id.
    pub fn login(&self, user: User, session_id: String) -> Result<(), ClientError> {
        let mut persisted = Ok(());
        self.inner.session.send_modify(|current| {
            *current = Some(session_id.clone());
            self.inner.user.send_replace(Some(user));
            persisted = self.inner.storage.set(SESSION_STORAGE_KEY, &session_id);
        });
        persisted
    }

    /// Log out. Local state is always cleared; server invalidation is best effort.
    pub async fn logout(&self) {
        let mut previous = None;
        self.inner.session.send_modify(|current| {
            previous = current.take();
            self.inner.user.send_replace(None);
            self.remove_persisted();
        });

        let Some(session_id) = previous else {
            return;
        };
        if let Err(e) = self.inner.backend.logout(&session_id).await {
            tracing::warn!(error = %e, "Server logout failed; local session cleared anyway");
        }
    }

    fn remove_persisted(&self) {
        if let Err(e) = self.inner.storage.remove(SESSION_STORAGE_KEY) {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
    }

    /// Run `fut` with this context available through [`use_auth`].
    pub async fn provide<F: Future>(self, fut: F) -> F::Output {
        CURRENT_AUTH.scope(self, fut).await
    }
}

/// The context of the enclosing [`AuthContext::provide`] scope.
///
/// # Panics
///
/// Panics when called outside a provider scope.
pub fn use_auth() -> AuthContext {
    match try_use_auth() {
        Some(ctx) => ctx,
        None => panic!("use_auth() called outside AuthContext::provide; wrap the caller in a provider"),
    }
}

/// Like [`use_auth`] but returns `None` outside a provider scope.
pub fn try_use_auth() -> Option<AuthContext> {
    CURRENT_AUTH.try_with(|ctx| ctx.clone()).ok()
}
