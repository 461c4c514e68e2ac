// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store for local development and tests
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Sliding session lifetime
    pub session_ttl_hours: i64,
    /// Per-request timeout applied at the HTTP boundary
    pub request_timeout_secs: u64,

    // --- Secrets ---
    /// Shared secret for the out-of-band admin provisioning endpoint
    pub admin_provisioning_token: String,
}

impl Config {
    pub const DEFAULT_SESSION_TTL_HOURS: i64 = 30 * 24;
    /// Ten years; keeps `now + ttl` far inside chrono's range
    pub const MAX_SESSION_TTL_HOURS: i64 = 10 * 365 * 24;
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
    pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            session_ttl_hours: parse_bounded(
                "SESSION_TTL_HOURS",
                Self::DEFAULT_SESSION_TTL_HOURS,
                Self::MAX_SESSION_TTL_HOURS,
            )?,
            request_timeout_secs: parse_bounded(
                "REQUEST_TIMEOUT_SECS",
                Self::DEFAULT_REQUEST_TIMEOUT_SECS,
                Self::MAX_REQUEST_TIMEOUT_SECS,
            )?,
            admin_provisioning_token: env::var("ADMIN_PROVISIONING_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ADMIN_PROVISIONING_TOKEN"))?,
        })
    }

    /// Config for tests: in-memory store, known provisioning token.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            session_ttl_hours: Self::DEFAULT_SESSION_TTL_HOURS,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            admin_provisioning_token: "test_provisioning_token".to_string(),
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parse `name` as a value in `1..=max`, or `default` when unset.
fn parse_bounded<T>(name: &'static str, default: T, max: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => parse_in_range(&raw, max).ok_or(ConfigError::Invalid(name, raw)),
    }
}

fn parse_in_range<T>(raw: &str, max: T) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|value| *value > T::default() && *value <= max)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("ADMIN_PROVISIONING_TOKEN", " provisioning-secret ");
        env::set_var("STORE_BACKEND", "memory");
        env::set_var("SESSION_TTL_HOURS", "48");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.admin_provisioning_token, "provisioning-secret");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.session_ttl(), chrono::Duration::hours(48));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_bounded_values() {
        let max = Config::MAX_SESSION_TTL_HOURS;
        assert_eq!(parse_in_range::<i64>(" 48 ", max), Some(48));
        assert_eq!(parse_in_range::<i64>(&max.to_string(), max), Some(max));
        assert_eq!(parse_in_range::<i64>(&(max + 1).to_string(), max), None);
        assert_eq!(parse_in_range::<i64>("9223372036854775807", max), None);
        assert_eq!(parse_in_range::<i64>("0", max), None);
        assert_eq!(parse_in_range::<i64>("-5", max), None);
        assert_eq!(parse_in_range::<u64>("soon", 600), None);
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("Firestore".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }
}
