// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access request routes: public submission and admin review.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{AccessRequest, AccessRequestStatus, SubmitAccessRequest};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Routes reachable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/access-requests", post(submit_request))
}

/// Review routes. The admin middleware is applied in routes/mod.rs.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/access-requests", get(list_requests))
        .route("/admin/access-requests/{id}/status", post(update_status))
        .route("/admin/access-requests/{id}", delete(delete_request))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// POST /access-requests
async fn submit_request(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SubmitAccessRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = state.access_requests.submit_request(form).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub status: Option<AccessRequestStatus>,
}

/// GET /admin/access-requests?status=pending
async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AccessRequest>>> {
    Ok(Json(state.access_requests.list_all(params.status).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: AccessRequestStatus,
}

/// POST /admin/access-requests/{id}/status
async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<AccessRequest>> {
    let updated = state
        .access_requests
        .update_status(&id, body.status, Some(&admin.user.email))
        .await?;
    Ok(Json(updated))
}

/// DELETE /admin/access-requests/{id}
async fn delete_request(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    tracing::info!(request_id = %id, admin = %admin.user.email, "Admin deleting access request");
    state.access_requests.delete_request(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
