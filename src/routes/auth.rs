// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email login, current-user lookup and logout.

use axum::{extract::State, http::HeaderMap, routing::{get, post}, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::error::Result;
use crate::middleware::auth::{session_token, SESSION_COOKIE};
use crate::models::User;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(current_user))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user: User,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CurrentUserResponse {
    pub user: Option<User>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// False if the server-side session could not be invalidated
    pub success: bool,
}

/// Build the session cookie. Mirrors the server-side sliding TTL.
fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.frontend_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(config.session_ttl_hours))
        .build()
}

/// POST /auth/login - whitelist-gated email login.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let outcome = state.sessions.login_with_email(&body.email).await?;

    let jar = jar.add(session_cookie(outcome.session_id.clone(), &state.config));

    Ok((
        jar,
        Json(LoginResponse {
            user: outcome.user,
            session_id: outcome.session_id,
        }),
    ))
}

/// GET /auth/me - resolve the presented session, `user: null` when there is none.
async fn current_user(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<CurrentUserResponse>> {
    let token = session_token(&jar, &headers);
    let user = state.sessions.get_current_user(token.as_deref()).await?;
    Ok(Json(CurrentUserResponse { user }))
}

/// POST /auth/logout - invalidate the session server-side and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Json<LogoutResponse>) {
    let mut success = true;
    if let Some(token) = session_token(&jar, &headers) {
        if let Err(e) = state.sessions.logout(&token).await {
            // The cookie is still removed; the stored session expires on its own
            tracing::warn!(error = %e, "Failed to invalidate session on logout");
            success = false;
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(LogoutResponse { success }))
}
