//! HTTP dispatch options.
//!
//! Options start from the engine configuration and are overridden per execution
//! by whatever the caller supplied.

use crate::config::EngineConfig;
use crate::models::ExecuteInput;
use serde::{Deserialize, Serialize};

/// Bytes per megabyte for `max_response_size_mb`.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Options controlling one HTTP dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOptions {
    /// Request timeout in milliseconds, covering connect, headers and body.
    pub timeout_ms: u64,

    /// Whether TLS certificates are verified.
    pub ssl_verification: bool,

    /// Whether 3xx responses are followed.
    pub follow_redirects: bool,

    /// Redirect hop limit when following.
    pub max_redirects: usize,

    /// Response size limit in megabytes.
    pub max_response_size_mb: Option<u64>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl HttpOptions {
    /// Creates options from the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            timeout_ms: config.timeout,
            ssl_verification: config.ssl_verification,
            follow_redirects: config.follow_redirects,
            max_redirects: config.max_redirects,
            max_response_size_mb: config.max_response_size,
        }
    }

    /// Applies the per-execution overrides present in `input`.
    pub fn with_overrides(mut self, input: &ExecuteInput) -> Self {
        if let Some(timeout) = input.timeout {
            self.timeout_ms = timeout;
        }
        if let Some(verify) = input.ssl_verification {
            self.ssl_verification = verify;
        }
        if let Some(follow) = input.follow_redirects {
            self.follow_redirects = follow;
        }
        if let Some(size) = input.max_response_size {
            self.max_response_size_mb = Some(size);
        }
        self
    }

    /// Returns the timeout as a `std::time::Duration`.
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    /// Response size limit in bytes, if any.
    pub fn max_response_bytes(&self) -> Option<u64> {
        self.max_response_size_mb
            .map(|mb| mb.saturating_mul(BYTES_PER_MB))
    }
}
