// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod access_requests;
pub mod sessions;
pub mod whitelist;

pub use access_requests::AccessRequestService;
pub use sessions::{LoginOutcome, SessionService};
pub use whitelist::WhitelistService;
