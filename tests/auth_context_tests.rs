// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client authentication context tests.
//!
//! Most tests use a scripted backend; the HTTP tests run the real router on a
//! loopback port.

use async_trait::async_trait;
use dashmap::DashMap;
use portal_access::client::{
    try_use_auth, use_auth, ApiErrorKind, AuthBackend, AuthContext, ClientError,
    FileSessionStorage, HttpAuthBackend, MemorySessionStorage, SessionStorage,
    SESSION_STORAGE_KEY,
};
use portal_access::models::{NewWhitelistEntry, Role, SubmitAccessRequest, User};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

mod common;

fn user(id: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        email: format!("{}@ex.com", id),
        name: id.to_string(),
        role,
        last_login_at: None,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

/// Backend answering from a session table, with switchable network failure.
#[derive(Default)]
struct ScriptedBackend {
    sessions: DashMap<String, User>,
    offline: AtomicBool,
    resolve_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    /// When set, `get_current_user` signals `entered` then waits on `release`
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedBackend {
    fn with_session(session_id: &str, user: User) -> Self {
        let backend = Self::default();
        backend.sessions.insert(session_id.to_string(), user);
        backend
    }

    fn check_network(&self) -> Result<(), ClientError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Transient("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn get_current_user(&self, session_id: &str) -> Result<Option<User>, ClientError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        self.check_network()?;
        Ok(self.sessions.get(session_id).map(|u| u.value().clone()))
    }

    async fn logout(&self, session_id: &str) -> Result<(), ClientError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        self.sessions.remove(session_id);
        Ok(())
    }
}

fn storage_with(session_id: Option<&str>) -> Arc<MemorySessionStorage> {
    let storage = Arc::new(MemorySessionStorage::new());
    if let Some(id) = session_id {
        storage.set(SESSION_STORAGE_KEY, id).unwrap();
    }
    storage
}

#[tokio::test]
async fn test_persisted_session_resolves_user() {
    let backend = Arc::new(ScriptedBackend::with_session("s1", user("alice", Role::User)));
    let ctx = AuthContext::new(backend.clone(), storage_with(Some("s1")));

    assert_eq!(ctx.session_id().as_deref(), Some("s1"));
    assert!(!ctx.is_authenticated());

    let resolved = ctx.resolve().await.unwrap();
    assert_eq!(resolved.map(|u| u.id), Some("alice".to_string()));
    assert!(ctx.is_authenticated());
    assert!(!ctx.is_admin());
}

#[tokio::test]
async fn test_no_session_skips_backend() {
    let backend = Arc::new(ScriptedBackend::default());
    let ctx = AuthContext::new(backend.clone(), storage_with(None));

    assert_eq!(ctx.resolve().await.unwrap(), None);
    assert_eq!(backend.resolve_calls.load(Ordering::SeqCst), 0);
    assert!(!ctx.is_authenticated());
}

#[tokio::test]
async fn test_login_persists_session() {
    let storage = storage_with(None);
    let ctx = AuthContext::new(Arc::new(ScriptedBackend::default()), storage.clone());

    ctx.login(user("root", Role::Admin), "s9".to_string()).unwrap();

    assert!(ctx.is_authenticated());
    assert!(ctx.is_admin());
    assert_eq!(ctx.session_id().as_deref(), Some("s9"));
    assert_eq!(
        storage.get(SESSION_STORAGE_KEY).unwrap().as_deref(),
        Some("s9")
    );
}

#[tokio::test]
async fn test_logout_while_offline_clears_everything() {
    let backend = Arc::new(ScriptedBackend::with_session("s1", user("alice", Role::User)));
    let storage = storage_with(Some("s1"));
    let ctx = AuthContext::new(backend.clone(), storage.clone());
    ctx.resolve().await.unwrap();
    assert!(ctx.is_authenticated());

    backend.offline.store(true, Ordering::SeqCst);
    ctx.logout().await;

    assert_eq!(backend.logout_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.current_user().is_none());
    assert!(ctx.session_id().is_none());
    assert!(!ctx.is_authenticated());
    assert_eq!(storage.get(SESSION_STORAGE_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_logout_without_session_skips_backend() {
    let backend = Arc::new(ScriptedBackend::default());
    let ctx = AuthContext::new(backend.clone(), storage_with(None));

    ctx.logout().await;
    assert_eq!(backend.logout_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_server_forgotten_session_is_cleared() {
    let backend = Arc::new(ScriptedBackend::default());
    let storage = storage_with(Some("expired"));
    let ctx = AuthContext::new(backend, storage.clone());

    assert_eq!(ctx.resolve().await.unwrap(), None);
    assert!(ctx.session_id().is_none());
    assert_eq!(storage.get(SESSION_STORAGE_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_transient_resolve_failure_keeps_session() {
    let backend = Arc::new(ScriptedBackend::with_session("s1", user("alice", Role::User)));
    backend.offline.store(true, Ordering::SeqCst);
    let storage = storage_with(Some("s1"));
    let ctx = AuthContext::new(backend, storage.clone());

    let err = ctx.resolve().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(ctx.session_id().as_deref(), Some("s1"));
    assert_eq!(
        storage.get(SESSION_STORAGE_KEY).unwrap().as_deref(),
        Some("s1")
    );
}

#[tokio::test]
async fn test_in_flight_result_discarded_after_session_change() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut backend = ScriptedBackend::with_session("s1", user("alice", Role::User));
    backend.gate = Some((entered.clone(), release.clone()));
    let ctx = AuthContext::new(Arc::new(backend), storage_with(Some("s1")));

    let resolving = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.resolve().await }
    });

    entered.notified().await;
    ctx.login(user("bob", Role::Admin), "s2".to_string()).unwrap();
    release.notify_one();

    let result = resolving.await.unwrap().unwrap();
    assert_eq!(result.map(|u| u.id), Some("bob".to_string()));
    assert_eq!(ctx.current_user().map(|u| u.id), Some("bob".to_string()));
    assert_eq!(ctx.session_id().as_deref(), Some("s2"));
}

#[tokio::test]
async fn test_resolver_follows_session_changes() {
    let backend = Arc::new(ScriptedBackend::with_session("s1", user("alice", Role::User)));
    let ctx = AuthContext::new(backend.clone(), storage_with(Some("s1")));
    let mut users = ctx.subscribe_user();

    let resolver = ctx.spawn_resolver();

    tokio::time::timeout(Duration::from_secs(5), users.wait_for(|u| u.is_some()))
        .await
        .expect("resolver did not resolve the persisted session")
        .unwrap();
    assert_eq!(ctx.current_user().map(|u| u.id), Some("alice".to_string()));

    ctx.logout().await;
    tokio::time::timeout(Duration::from_secs(5), users.wait_for(|u| u.is_none()))
        .await
        .unwrap()
        .unwrap();

    resolver.abort();
}

#[tokio::test]
async fn test_provider_scope() {
    assert!(try_use_auth().is_none());

    let ctx = AuthContext::new(Arc::new(ScriptedBackend::default()), storage_with(None));
    ctx.login(user("alice", Role::User), "s1".to_string()).unwrap();

    let seen = ctx
        .clone()
        .provide(async { use_auth().session_id() })
        .await;
    assert_eq!(seen.as_deref(), Some("s1"));
}

#[tokio::test]
#[should_panic(expected = "outside AuthContext::provide")]
async fn test_use_auth_outside_provider_panics() {
    let _ = use_auth();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_login_logout_keeps_storage_in_sync() {
    let backend = Arc::new(ScriptedBackend::default());
    let storage = storage_with(None);
    let ctx = AuthContext::new(backend, storage.clone());
    let resolver = ctx.spawn_resolver();

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let ctx = ctx.clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..50 {
                ctx.login(user("alice", Role::User), format!("s{worker}-{n}"))
                    .unwrap();
                tokio::task::yield_now().await;
                if n % 2 == 0 {
                    ctx.logout().await;
                }
                let _ = ctx.resolve().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    resolver.abort();
    let _ = resolver.await;

    // Memory and storage agree, and a user is present exactly when a session is
    assert_eq!(storage.get(SESSION_STORAGE_KEY).unwrap(), ctx.session_id());
    assert_eq!(ctx.is_authenticated(), ctx.session_id().is_some());
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP BACKEND
// ═══════════════════════════════════════════════════════════════════════════

/// Serve the test router on a loopback port and return its base URL.
async fn serve(app: &common::TestApp) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A loopback URL with nothing listening.
async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_session_survives_restart() {
    let app = common::create_test_app();
    app.state
        .whitelist
        .add_to_whitelist(NewWhitelistEntry::new("alice@ex.com"), None)
        .await
        .unwrap();
    let base_url = serve(&app).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.json");

    let http = HttpAuthBackend::new(&base_url).unwrap();
    let login = http.login_with_email("alice@ex.com").await.unwrap();
    let ctx = AuthContext::new(Arc::new(http.clone()), Arc::new(FileSessionStorage::new(&path)));
    ctx.login(login.user, login.session_id.clone()).unwrap();

    // Restart: fresh context over the same file
    let restarted =
        AuthContext::new(Arc::new(http.clone()), Arc::new(FileSessionStorage::new(&path)));
    assert_eq!(restarted.session_id(), Some(login.session_id.clone()));
    let user = restarted.resolve().await.unwrap().unwrap();
    assert_eq!(user.email, "alice@ex.com");

    restarted.logout().await;
    assert!(FileSessionStorage::new(&path)
        .get(SESSION_STORAGE_KEY)
        .unwrap()
        .is_none());

    // Server-side invalidation reached the API
    assert_eq!(http.get_current_user(&login.session_id).await.unwrap(), None);
}

#[tokio::test]
async fn test_http_errors_are_typed() {
    let app = common::create_test_app();
    let base_url = serve(&app).await;
    let http = HttpAuthBackend::new(&base_url).unwrap();

    let err = http.login_with_email("nobody@ex.com").await.unwrap_err();
    assert_eq!(err.api_kind(), Some(ApiErrorKind::AccessDenied));

    let form = SubmitAccessRequest {
        full_name: "Bob".to_string(),
        email: "bob@ex.com".to_string(),
        unit_number: "2A".to_string(),
        mobile: None,
    };
    http.submit_access_request(&form).await.unwrap();
    let err = http.submit_access_request(&form).await.unwrap_err();
    assert_eq!(err.api_kind(), Some(ApiErrorKind::DuplicatePendingRequest));
    assert!(matches!(err, ClientError::Api { status: 409, .. }));
}

#[tokio::test]
async fn test_http_logout_with_server_down() {
    let http = HttpAuthBackend::with_timeout(dead_url().await, Duration::from_secs(2)).unwrap();
    let storage = storage_with(Some("s1"));
    let ctx = AuthContext::new(Arc::new(http.clone()), storage.clone());

    let err = http.get_current_user("s1").await.unwrap_err();
    assert!(err.is_transient(), "expected transient error, got {err:?}");

    ctx.logout().await;
    assert!(ctx.session_id().is_none());
    assert!(ctx.current_user().is_none());
    assert_eq!(storage.get(SESSION_STORAGE_KEY).unwrap(), None);
}
