// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use portal_access::config::Config;
use portal_access::db::{FirestoreDb, InMemoryStore};
use portal_access::middleware::provisioning_auth::PROVISIONING_TOKEN_HEADER;
use portal_access::routes::create_router;
use portal_access::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test app over a fresh in-memory store.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryStore>,
}

/// Create a test app with an in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let state = Arc::new(AppState::new(config, store.clone()));
    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}

impl TestApp {
    /// Send one request through a clone of the router.
    #[allow(dead_code)]
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a JSON request, optionally with a bearer session token.
    #[allow(dead_code)]
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self.send(builder.body(body).unwrap()).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Provision an admin and log in as them. Returns the session token.
    #[allow(dead_code)]
    pub async fn admin_session(&self, email: &str) -> String {
        self.state
            .sessions
            .create_admin_user(email, "Admin")
            .await
            .unwrap();
        self.state
            .sessions
            .login_with_email(email)
            .await
            .unwrap()
            .session_id
    }

    /// Whitelist an email and log in as a regular user. Returns the session token.
    #[allow(dead_code)]
    pub async fn user_session(&self, email: &str) -> String {
        self.state
            .whitelist
            .add_to_whitelist(
                portal_access::models::NewWhitelistEntry::new(email),
                Some("test"),
            )
            .await
            .unwrap();
        self.state
            .sessions
            .login_with_email(email)
            .await
            .unwrap()
            .session_id
    }

    /// POST to the provisioning route with the given token header.
    #[allow(dead_code)]
    pub async fn provision(&self, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/internal/admin-users")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(PROVISIONING_TOKEN_HEADER, token);
        }
        let response = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        let status = response.status();
        (status, body_json(response).await)
    }
}

/// Parse a response body as JSON; empty bodies become `Value::Null`.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// Generate a unique email for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}
