// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process configuration loaded from environment variables.
//!
//! Runtime settings that operators change while the service is running live
//! in the configuration store instead (see `services::configuration`).

use std::env;
use std::str::FromStr;

/// Which [`Store`](crate::db::Store) implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Allowed CORS origin
    pub frontend_url: String,
    /// HMAC key for access tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// HMAC key for refresh tokens; must differ from `jwt_secret`
    pub jwt_refresh_secret: Vec<u8>,
    /// Sent as `Client-ID` on Twitch API calls
    pub twitch_client_id: String,
    pub store_backend: StoreBackend,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Timeout for outbound provider profile requests
    pub provider_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let jwt_secret = required("JWT_SECRET")?.into_bytes();
        let jwt_refresh_secret = required("JWT_REFRESH_SECRET")?.into_bytes();
        if jwt_secret == jwt_refresh_secret {
            return Err(ConfigError::Invalid(
                "JWT_REFRESH_SECRET",
                "must differ from JWT_SECRET".to_string(),
            ));
        }

        Ok(Self {
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            jwt_secret,
            jwt_refresh_secret,
            twitch_client_id: lookup("TWITCH_CLIENT_ID").unwrap_or_default(),
            store_backend: lookup("STORE_BACKEND")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(StoreBackend::Firestore),
            gcp_project_id: lookup("GCP_PROJECT_ID").unwrap_or_else(|| "local-dev".to_string()),
            provider_timeout_secs: lookup("PROVIDER_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            jwt_secret: b"test_jwt_secret_32_bytes_minimum!".to_vec(),
            jwt_refresh_secret: b"test_refresh_secret_32_bytes_min!".to_vec(),
            twitch_client_id: "test_twitch_client".to_string(),
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            provider_timeout_secs: 5,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
