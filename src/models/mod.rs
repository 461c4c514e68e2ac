// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod access_request;
pub mod email;
pub mod session;
pub mod user;
pub mod whitelist;

pub use access_request::{AccessRequest, AccessRequestStatus, SubmitAccessRequest};
pub use email::normalize_email;
pub use session::Session;
pub use user::{Role, User};
pub use whitelist::{BulkImportSummary, NewWhitelistEntry, WhitelistEntry};
