// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Out-of-band admin provisioning (operator use only).

use crate::error::Result;
use crate::routes::access_requests::CreatedResponse;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

/// Guarded by the provisioning token in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/internal/admin-users", post(create_admin_user))
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminBody {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// POST /internal/admin-users
async fn create_admin_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAdminBody>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = state
        .sessions
        .create_admin_user(&body.email, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
