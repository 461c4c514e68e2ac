// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server calls made by the authentication context.

use super::ClientError;
use super::error::ApiErrorKind;
use crate::error::ErrorResponse;
use crate::models::{SubmitAccessRequest, User};
use crate::routes::access_requests::CreatedResponse;
use crate::routes::auth::{CurrentUserResponse, LoginRequest, LoginResponse, LogoutResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Session operations the context needs from the server.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `Ok(None)` means the server no longer recognizes the session.
    async fn get_current_user(&self, session_id: &str) -> Result<Option<User>, ClientError>;

    async fn logout(&self, session_id: &str) -> Result<(), ClientError>;
}

/// HTTP client for the portal API.
#[derive(Clone)]
pub struct HttpAuthBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in by email. The caller hands the result to `AuthContext::login`.
    pub async fn login_with_email(&self, email: &str) -> Result<LoginResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
            })
            .send()
            .await?;
        decode(response).await
    }

    /// Submit the public access-request form; returns the new request id.
    pub async fn submit_access_request(
        &self,
        form: &SubmitAccessRequest,
    ) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/access-requests"))
            .json(form)
            .send()
            .await?;
        let created: CreatedResponse = decode(response).await?;
        Ok(created.id)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn get_current_user(&self, session_id: &str) -> Result<Option<User>, ClientError> {
        let response = self
            .http
            .get(self.url("/auth/me"))
            .bearer_auth(session_id)
            .send()
            .await?;
        let body: CurrentUserResponse = decode(response).await?;
        Ok(body.user)
    }

    async fn logout(&self, session_id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(session_id)
            .send()
            .await?;
        let body: LogoutResponse = decode(response).await?;
        if !body.success {
            return Err(ClientError::Transient(
                "server could not invalidate the session".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decode a success body or turn the error envelope into a `ClientError`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    let envelope: Option<ErrorResponse> = serde_json::from_str(&text).ok();

    if status == StatusCode::SERVICE_UNAVAILABLE
        || envelope.as_ref().is_some_and(|e| e.error == "transient")
    {
        let details = envelope.and_then(|e| e.details).unwrap_or(text);
        return Err(ClientError::Transient(details));
    }

    let (kind, details) = match envelope {
        Some(e) => (ApiErrorKind::from_code(&e.error), e.details.unwrap_or_default()),
        None => (ApiErrorKind::Unknown, text),
    };

    Err(ClientError::Api {
        kind,
        status: status.as_u16(),
        details,
    })
}
