//! Service configuration.
//!
//! Values come from an optional JSON file, then `REVIEW_ROTA_*` environment
//! variables override individual fields.

use crate::db::pool::DEFAULT_MAX_CONNECTIONS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_DATABASE: &str = "REVIEW_ROTA_DATABASE";
pub const ENV_BIND: &str = "REVIEW_ROTA_BIND";
pub const ENV_TOKEN_SECRET: &str = "REVIEW_ROTA_TOKEN_SECRET";
pub const ENV_MAX_CONNECTIONS: &str = "REVIEW_ROTA_MAX_CONNECTIONS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REVIEW_ROTA_REQUEST_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "REVIEW_ROTA_LOG_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime settings for the API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Socket address the HTTP server binds to.
    pub bind_address: String,

    /// HMAC secret for API tokens.
    pub token_secret: String,

    /// Upper bound on pooled database connections.
    pub max_connections: u32,

    /// Requests running longer than this are aborted and rolled back.
    pub request_timeout_secs: u64,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("review-rota.db"),
            bind_address: "0.0.0.0:8080".to_string(),
            token_secret: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            request_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from an optional file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from variables returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DATABASE) {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_BIND) {
            self.bind_address = value;
        }
        if let Some(value) = lookup(ENV_TOKEN_SECRET) {
            self.token_secret = value;
        }
        if let Some(value) = lookup(ENV_MAX_CONNECTIONS) {
            self.max_connections = parse_env(ENV_MAX_CONNECTIONS, value)?;
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_env(ENV_REQUEST_TIMEOUT_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "token secret is empty (set {} or token_secret)",
                ENV_TOKEN_SECRET
            )));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}
