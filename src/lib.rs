// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Portal access gate: email whitelist, access requests and sessions
//! for the community portal.
//!
//! The server side (`routes`, `services`, `db`) runs the access-request
//! review workflow and whitelist-gated login. The [`client`] module holds the
//! authentication context front ends use to keep the session in sync.

pub mod client;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{AccessRequestService, SessionService, WhitelistService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub whitelist: WhitelistService,
    pub access_requests: AccessRequestService,
    pub sessions: SessionService,
}

impl AppState {
    /// Wire the services over a single store.
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let whitelist = WhitelistService::new(store.clone());
        let access_requests = AccessRequestService::new(store.clone(), whitelist.clone());
        let sessions = SessionService::new(store.clone(), whitelist.clone(), config.session_ttl());

        Self {
            config,
            store,
            whitelist,
            access_requests,
            sessions,
        }
    }
}
