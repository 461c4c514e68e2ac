// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Portal Access API Server
//!
//! Runs the access-request review workflow and whitelist-gated login for
//! the community portal.

use portal_access::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, InMemoryStore, Store},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.store_backend, "Starting Portal Access API");

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Firestore => {
            Arc::new(FirestoreDb::new(&config.gcp_project_id).await?) as Arc<dyn Store>
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new()) as Arc<dyn Store>
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store));

    // Build router
    let app = portal_access::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portal_access=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
