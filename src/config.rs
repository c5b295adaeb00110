//! Application configuration loaded from environment variables.
//!
//! Read once at startup. The timezone is fixed for the life of the process
//! and handed to the attendance service explicitly.

use std::env;

use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Which store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Zone that defines calendar days for every user
    pub timezone: Tz,
    pub store: StoreKind,
    /// JWT verification key for bearer tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            timezone: chrono_tz::Asia::Tokyo,
            store: StoreKind::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let timezone = env::var("TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let store = env::var("STORE").unwrap_or_else(|_| "firestore".to_string());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            timezone: parse_timezone(&timezone)?,
            store: parse_store_kind(&store)?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }
}

fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("TIMEZONE", name.to_string()))
}

fn parse_store_kind(name: &str) -> Result<StoreKind, ConfigError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "firestore" => Ok(StoreKind::Firestore),
        "memory" => Ok(StoreKind::Memory),
        _ => Err(ConfigError::Invalid("STORE", name.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
