//! Transport error types.
//!
//! Only failures where no HTTP response was obtained are errors here. Any status
//! code, including 4xx and 5xx, is a successful dispatch.

use std::fmt;

/// Classified transport-level failure.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// No complete response within the configured timeout.
    Timeout { timeout_ms: u64 },

    /// The hostname could not be resolved.
    Dns,

    /// The remote host actively refused the connection.
    ConnectionRefused,

    /// The response body exceeded the configured limit.
    SizeLimitExceeded { limit_mb: u64 },

    /// The URL could not be parsed.
    InvalidUrl(String),

    /// The HTTP client or request could not be built.
    Build(String),

    /// Any other network failure.
    Network(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout { timeout_ms } => {
                write!(f, "Request timeout after {}ms", timeout_ms)
            }
            TransportError::Dns => write!(f, "DNS lookup failed"),
            TransportError::ConnectionRefused => write!(f, "Connection refused"),
            TransportError::SizeLimitExceeded { limit_mb } => {
                write!(f, "Response size exceeded limit of {}MB", limit_mb)
            }
            TransportError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            TransportError::Build(msg) => write!(f, "Request build error: {}", msg),
            TransportError::Network(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

/// Markers found in resolver error messages across platforms.
const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
];

impl TransportError {
    /// Classifies a reqwest error.
    ///
    /// # Arguments
    ///
    /// * `err` - The error returned by the client
    /// * `timeout_ms` - Timeout in effect, reported in the timeout message
    pub fn classify(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }
        if err.is_builder() {
            return TransportError::Build(err.to_string());
        }

        let mut messages = Vec::new();
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(current) = source {
            if let Some(io) = current.downcast_ref::<std::io::Error>() {
                match io.kind() {
                    std::io::ErrorKind::ConnectionRefused => {
                        return TransportError::ConnectionRefused
                    }
                    std::io::ErrorKind::TimedOut => return TransportError::Timeout { timeout_ms },
                    _ => {}
                }
            }
            messages.push(current.to_string().to_lowercase());
            source = current.source();
        }

        let chain = messages.join(": ");
        if DNS_MARKERS.iter().any(|marker| chain.contains(marker)) {
            TransportError::Dns
        } else if chain.contains("connection refused") {
            TransportError::ConnectionRefused
        } else {
            TransportError::Network(err.to_string())
        }
    }
}
