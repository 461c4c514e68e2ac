// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whitelist management routes (admin only).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{BulkImportSummary, NewWhitelistEntry, WhitelistEntry};
use crate::routes::access_requests::CreatedResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Rows accepted by a single import call.
const MAX_IMPORT_ROWS: usize = 5000;

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/whitelist", get(list_whitelist).post(add_entry))
        .route("/admin/whitelist/import", post(bulk_import))
        .route("/admin/whitelist/{id}/active", put(set_active))
        .route("/admin/whitelist/{id}", axum::routing::delete(remove_entry))
}

/// GET /admin/whitelist
async fn list_whitelist(State(state): State<Arc<AppState>>) -> Result<Json<Vec<WhitelistEntry>>> {
    Ok(Json(state.whitelist.get_whitelist().await?))
}

/// POST /admin/whitelist
async fn add_entry(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(entry): Json<NewWhitelistEntry>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = state
        .whitelist
        .add_to_whitelist(entry, Some(&admin.user.email))
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[derive(Debug, Deserialize)]
pub struct BulkImportBody {
    pub entries: Vec<NewWhitelistEntry>,
}

/// POST /admin/whitelist/import
async fn bulk_import(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<BulkImportBody>,
) -> Result<Json<BulkImportSummary>> {
    if body.entries.len() > MAX_IMPORT_ROWS {
        return Err(AppError::BadRequest(format!(
            "Import limited to {} rows per request",
            MAX_IMPORT_ROWS
        )));
    }
    let summary = state
        .whitelist
        .bulk_import(body.entries, Some(&admin.user.email))
        .await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveBody {
    pub is_active: bool,
}

/// PUT /admin/whitelist/{id}/active
async fn set_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SetActiveBody>,
) -> Result<Json<WhitelistEntry>> {
    Ok(Json(state.whitelist.set_active(&id, body.is_active).await?))
}

/// DELETE /admin/whitelist/{id}
async fn remove_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.whitelist.remove_from_whitelist(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
