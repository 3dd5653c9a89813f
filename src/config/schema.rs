//! Configuration schema for the execution engine.
//!
//! This module defines the configuration structure and validation logic for all
//! engine-level settings. Values that would otherwise be hidden conventions (the
//! default environment name, the acting user) live here and are threaded into the
//! runner explicitly.

use crate::models::request::{MAX_RESPONSE_SIZE_RANGE, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Errors raised while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Settings could not be deserialized.
    Parse(serde_json::Error),
    /// A setting is outside its accepted range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "Failed to parse settings: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Engine configuration.
///
/// Missing settings fall back to the defaults documented on each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Environment used when an execution names neither variables nor an
    /// environment id. Defaults to "Local Environment".
    #[serde(default = "default_environment_name")]
    pub default_environment_name: String,

    /// User the engine acts as for collection lookups and history.
    /// Defaults to "system".
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Request timeout in milliseconds. Defaults to 30000ms.
    ///
    /// Must be within 1000..=120000.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Whether to validate SSL/TLS certificates. Defaults to true.
    #[serde(default = "default_true")]
    pub ssl_verification: bool,

    /// Whether to follow HTTP redirects. Defaults to true.
    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow. Defaults to 5.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Maximum response size in megabytes. Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_size: Option<u64>,

    /// Wall-clock budget per script phase, in milliseconds. Defaults to 5000ms.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_script_timeout")]
    pub script_timeout: u64,

    /// Optional cap on interpreter operations per script phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_max_operations: Option<u64>,

    /// Whether post-script environment changes are written back to storage.
    /// Defaults to false.
    #[serde(default)]
    pub persist_script_environment: bool,

    /// Whether sensitive headers are stripped from history records.
    /// Defaults to false.
    #[serde(default)]
    pub sanitize_history_headers: bool,

    /// Whether response bodies over 1 MB are dropped from history records.
    /// Defaults to true.
    #[serde(default = "default_true")]
    pub drop_large_history_bodies: bool,

    /// Headers added underneath collection and request headers on every execution.
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_environment_name: default_environment_name(),
            user_id: default_user_id(),
            timeout: default_timeout(),
            ssl_verification: true,
            follow_redirects: true,
            max_redirects: default_max_redirects(),
            max_response_size: None,
            script_timeout: default_script_timeout(),
            script_max_operations: None,
            persist_script_environment: false,
            sanitize_history_headers: false,
            drop_large_history_bodies: true,
            default_headers: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout) {
            return Err(ConfigError::Invalid(format!(
                "timeout must be between {} and {} ms",
                MIN_TIMEOUT_MS, MAX_TIMEOUT_MS
            )));
        }

        if let Some(size) = self.max_response_size {
            if !MAX_RESPONSE_SIZE_RANGE.contains(&size) {
                return Err(ConfigError::Invalid(format!(
                    "maxResponseSize must be between {} and {} MB",
                    MAX_RESPONSE_SIZE_RANGE.start(),
                    MAX_RESPONSE_SIZE_RANGE.end()
                )));
            }
        }

        if self.script_timeout == 0 {
            return Err(ConfigError::Invalid(
                "scriptTimeout must be greater than 0".to_string(),
            ));
        }

        if self.user_id.trim().is_empty() {
            return Err(ConfigError::Invalid("userId must not be empty".to_string()));
        }

        Ok(())
    }

    /// Parses and validates a settings object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed settings and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the script budget as a `std::time::Duration`.
    pub fn script_timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.script_timeout)
    }
}

// Default value functions for serde

fn default_environment_name() -> String {
    "Local Environment".to_string()
}

fn default_user_id() -> String {
    "system".to_string()
}

fn default_timeout() -> u64 {
    30000
}

fn default_true() -> bool {
    true
}

fn default_max_redirects() -> usize {
    5
}

fn default_script_timeout() -> u64 {
    5000
}
