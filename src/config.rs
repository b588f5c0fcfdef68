//! # Configuration Module
//!
//! Centralized, typed configuration for the authorization service. All
//! settings are read from the environment exactly once at startup and then
//! injected into the application state; no module reads the environment on
//! its own after that point.
//!
//! ## Environment Variables
//!
//! - `DATABASE_URL`: SQLite database URL (default: `sqlite:./auth.db`)
//! - `DATABASE_SCHEMA`: optional table-name prefix for shared database hosts
//! - `DATABASE_POOL_SIZE`: connection pool ceiling (default: 20)
//! - `JWT_SECRET`: signing secret for token-issuing deployments
//! - `ENCRYPTION_KEY`: password for deterministic field encryption
//! - `ENABLE_ENCRYPTION`: `true`/`false` (default: `false`)
//! - `ENABLE_AUDIT_LOGGING`: `true`/`false` (default: `true`)
//! - `SERVER_HOST` / `SERVER_PORT`: bind address (default: `0.0.0.0:4000`)

use std::time::Duration;

use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "default_secret_key_for_development";

/// Configuration loading or validation failure.
///
/// Maps to process exit code 1 in the launcher.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
    #[error("ENCRYPTION_KEY is required when ENABLE_ENCRYPTION is true")]
    MissingEncryptionKey,
}

/// Typed settings loaded once per process.
///
/// Read-only after startup; shared across requests behind `Arc<AppState>`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_schema: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub encryption_key: String,
    pub enable_encryption: bool,
    pub enable_audit_logging: bool,
    pub server_host: String,
    pub server_port: u16,
    pub request_timeout: Duration,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Call `dotenv::dotenv().ok()` before this if a `.env` file should be
    /// honored. Returns `ConfigError` for malformed numeric values or an
    /// inconsistent encryption configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./auth.db".to_string());

        let database_schema = std::env::var("DATABASE_SCHEMA")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let max_connections = parse_env("DATABASE_POOL_SIZE", 20u32)?;

        let jwt_secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        if jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("using default JWT secret; set JWT_SECRET for production");
        }

        let encryption_key = std::env::var("ENCRYPTION_KEY").unwrap_or_default();
        let enable_encryption = parse_bool("ENABLE_ENCRYPTION", false);
        if enable_encryption && encryption_key.is_empty() {
            return Err(ConfigError::MissingEncryptionKey);
        }

        let enable_audit_logging = parse_bool("ENABLE_AUDIT_LOGGING", true);

        let server_host =
            std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = parse_env("SERVER_PORT", 4000u16)?;

        let timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", 30u64)?;

        Ok(Settings {
            database_url,
            database_schema,
            max_connections,
            jwt_secret,
            encryption_key,
            enable_encryption,
            enable_audit_logging,
            server_host,
            server_port,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        // Env-free construction path: defaults only.
        let settings = Settings {
            database_url: "sqlite:./auth.db".into(),
            database_schema: None,
            max_connections: 20,
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            encryption_key: String::new(),
            enable_encryption: false,
            enable_audit_logging: true,
            server_host: "0.0.0.0".into(),
            server_port: 4000,
            request_timeout: Duration::from_secs(30),
        };
        assert_eq!(settings.bind_addr(), "0.0.0.0:4000");
        assert!(!settings.enable_encryption);
    }
}
