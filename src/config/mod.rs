//! Configuration management for the execution engine.
//!
//! Configuration is read from a settings object under the "api-tester" key and
//! merged over defaults. There is no process-wide instance: callers hold the
//! loaded [`EngineConfig`] and hand it to the runner.

pub mod schema;

pub use schema::{ConfigError, EngineConfig};

use log::warn;
use serde_json::Value;

/// Settings key the engine configuration is read from.
pub const SETTINGS_KEY: &str = "api-tester";

/// Loads configuration from a settings object.
///
/// Reads the "api-tester" settings, merges them with defaults and validates the
/// result. Malformed or invalid settings are reported with a warning and the
/// defaults are used instead.
///
/// # Arguments
///
/// * `settings_json` - Optional JSON value containing user settings under "api-tester"
///
/// # Example
///
/// ```
/// use api_tester::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "api-tester": {
///         "timeout": 60000,
///         "sslVerification": false
///     }
/// });
///
/// let config = load_config(Some(settings));
/// assert_eq!(config.timeout, 60000);
/// assert!(!config.ssl_verification);
/// ```
pub fn load_config(settings_json: Option<Value>) -> EngineConfig {
    let user_settings = match settings_json.and_then(|s| s.get(SETTINGS_KEY).cloned()) {
        Some(settings) => settings,
        None => return EngineConfig::default(),
    };

    match EngineConfig::from_value(user_settings) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}. Using defaults.", e);
            EngineConfig::default()
        }
    }
}
