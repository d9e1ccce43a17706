//! Configuration management for the todo store.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors while reading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `TODO_MODE` names no persistence mode
    #[error("Invalid TODO_MODE {0:?} (expected \"local\" or \"remote\")")]
    InvalidMode(String),
}

/// Persistence strategy of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    /// Durable local slot only
    Local,
    /// Remote HTTP API as source of truth
    Remote,
}

impl FromStr for PersistenceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// Store configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoConfig {
    /// Persistence strategy (`TODO_MODE`, default `local`)
    pub mode: PersistenceMode,
    /// Remote API base URL (`TODO_API_URL`, default `http://localhost:3000`)
    pub api_url: String,
    /// Directory of the local slot (`TODO_STORAGE_DIR`, default `.todo-sync`)
    pub storage_dir: PathBuf,
    /// Snapshot channel capacity (`TODO_BROADCAST_CAPACITY`, default 64)
    pub broadcast_capacity: usize,
    /// Optional HTTP timeout in seconds (`TODO_REQUEST_TIMEOUT_SECS`, default none)
    pub request_timeout_secs: Option<u64>,
    /// Optional Prometheus listener port (`TODO_METRICS_PORT`, default none)
    pub metrics_port: Option<u16>,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            mode: PersistenceMode::Local,
            api_url: "http://localhost:3000".to_string(),
            storage_dir: PathBuf::from(".todo-sync"),
            broadcast_capacity: 64,
            request_timeout_secs: None,
            metrics_port: None,
        }
    }
}

impl TodoConfig {
    /// Load configuration from environment variables
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMode` when `TODO_MODE` is set to an unknown mode.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMode` when `TODO_MODE` is set to an unknown mode.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            mode: lookup("TODO_MODE")
                .map(|s| s.parse::<PersistenceMode>())
                .transpose()?
                .unwrap_or(defaults.mode),
            api_url: lookup("TODO_API_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            storage_dir: lookup("TODO_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            broadcast_capacity: lookup("TODO_BROADCAST_CAPACITY")
                .and_then(|s| s.parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.broadcast_capacity),
            request_timeout_secs: lookup("TODO_REQUEST_TIMEOUT_SECS").and_then(|s| s.parse().ok()),
            metrics_port: lookup("TODO_METRICS_PORT").and_then(|s| s.parse().ok()),
        })
    }

    /// HTTP timeout as a `Duration`
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = TodoConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TodoConfig::default());
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn reads_all_variables() {
        let config = TodoConfig::from_lookup(lookup(&[
            ("TODO_MODE", "Remote"),
            ("TODO_API_URL", "http://api.example.com/"),
            ("TODO_STORAGE_DIR", "/tmp/todos"),
            ("TODO_BROADCAST_CAPACITY", "8"),
            ("TODO_REQUEST_TIMEOUT_SECS", "5"),
            ("TODO_METRICS_PORT", "9000"),
        ]))
        .unwrap();

        assert_eq!(config.mode, PersistenceMode::Remote);
        assert_eq!(config.api_url, "http://api.example.com");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/todos"));
        assert_eq!(config.broadcast_capacity, 8);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.metrics_port, Some(9000));
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let config = TodoConfig::from_lookup(lookup(&[
            ("TODO_BROADCAST_CAPACITY", "lots"),
            ("TODO_METRICS_PORT", "-1"),
        ]))
        .unwrap();
        assert_eq!(config.broadcast_capacity, 64);
        assert_eq!(config.metrics_port, None);
    }

    #[test]
    fn unknown_mode_is_an_error() {
        assert_eq!(
            TodoConfig::from_lookup(lookup(&[("TODO_MODE", "cloud")])),
            Err(ConfigError::InvalidMode("cloud".to_string()))
        );
    }
}
