// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret guard for the out-of-band admin provisioning routes.

use crate::crypto::secrets_match;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Header carrying the provisioning secret.
pub const PROVISIONING_TOKEN_HEADER: &str = "x-provisioning-token";

/// Require the configured provisioning token for `/internal/*` routes.
pub async fn require_provisioning_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(PROVISIONING_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !secrets_match(presented, &state.config.admin_provisioning_token) {
        tracing::warn!(
            path = %request.uri().path(),
            "Blocked provisioning request with invalid token"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
