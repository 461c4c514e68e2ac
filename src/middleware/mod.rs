// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (session auth, provisioning guard, security headers).

pub mod auth;
pub mod provisioning_auth;
pub mod security;

pub use auth::{require_admin, require_auth};
pub use provisioning_auth::require_provisioning_token;
