// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side authentication context.

pub mod backend;
pub mod context;
pub mod error;
pub mod storage;

pub use backend::{AuthBackend, HttpAuthBackend};
pub use context::{try_use_auth, use_auth, AuthContext};
pub use error::{ApiErrorKind, ClientError};
pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage, SESSION_STORAGE_KEY};
