//! Request-side data models.
//!
//! This module defines the HTTP method enum, the saved request entity as stored by
//! the storage collaborator, the execution entry-point payload, and the resolved
//! execution context that flows through scripting and dispatch.

use crate::variables::VariableMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Timeout bounds accepted on the execution entry point, in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 1_000;
/// Upper timeout bound accepted on the execution entry point, in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 120_000;
/// Bounds for `maxResponseSize`, in megabytes.
pub const MAX_RESPONSE_SIZE_RANGE: std::ops::RangeInclusive<u64> = 1..=100;

/// HTTP request method.
///
/// Only the methods the engine is willing to dispatch are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET method - retrieve a resource
    GET,
    /// HTTP POST method - submit data to create a resource
    POST,
    /// HTTP PUT method - replace a resource
    PUT,
    /// HTTP PATCH method - partially modify a resource
    PATCH,
    /// HTTP DELETE method - remove a resource
    DELETE,
    /// HTTP HEAD method - retrieve headers only
    HEAD,
    /// HTTP OPTIONS method - describe communication options
    OPTIONS,
}

impl HttpMethod {
    /// Returns the string representation of the HTTP method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    /// Parses a string into an HttpMethod, case-insensitively.
    ///
    /// # Returns
    ///
    /// `Some(HttpMethod)` if the string names a supported method, `None` otherwise.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "PATCH" => Some(HttpMethod::PATCH),
            "DELETE" => Some(HttpMethod::DELETE),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    /// Whether a request body is transmitted for this method.
    pub fn sends_body(&self) -> bool {
        matches!(
            self,
            HttpMethod::POST | HttpMethod::PUT | HttpMethod::PATCH | HttpMethod::DELETE
        )
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A saved request as held by the storage collaborator.
///
/// Templates (`url`, `headers`, `body`) may contain `{{name}}` placeholders.
/// Headers are kept in their serialized JSON object form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRequest {
    /// Unique identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// HTTP method.
    pub method: HttpMethod,

    /// URL template.
    pub url: String,

    /// Serialized header mapping (JSON object of name to value).
    #[serde(default = "default_serialized_headers")]
    pub headers: String,

    /// Body template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Script run before dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request_script: Option<String>,

    /// Script run after dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_request_script: Option<String>,

    /// Owning collection.
    pub collection_id: String,

    /// Last-modified timestamp, the optimistic-concurrency token.
    pub updated_at: DateTime<Utc>,
}

fn default_serialized_headers() -> String {
    "{}".to_string()
}

impl SavedRequest {
    /// Creates a new saved request with a generated id and the current timestamp.
    pub fn new(
        name: impl Into<String>,
        method: HttpMethod,
        url: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            method,
            url: url.into(),
            headers: default_serialized_headers(),
            body: None,
            pre_request_script: None,
            post_request_script: None,
            collection_id: collection_id.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Partial update for a saved request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_request_script: Option<String>,
}

impl RequestUpdate {
    /// Applies the present fields onto `request`. Does not touch `updated_at`.
    pub fn apply_to(&self, request: &mut SavedRequest) {
        if let Some(name) = &self.name {
            request.name = name.clone();
        }
        if let Some(method) = self.method {
            request.method = method;
        }
        if let Some(url) = &self.url {
            request.url = url.clone();
        }
        if let Some(headers) = &self.headers {
            request.headers = headers.clone();
        }
        if let Some(body) = &self.body {
            request.body = Some(body.clone());
        }
        if let Some(script) = &self.pre_request_script {
            request.pre_request_script = Some(script.clone());
        }
        if let Some(script) = &self.post_request_script {
            request.post_request_script = Some(script.clone());
        }
    }
}

/// Payload accepted by the execution entry point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteInput {
    /// HTTP method name; validated against [`HttpMethod`].
    pub method: String,

    /// URL template.
    pub url: String,

    /// Caller headers. These win over collection-level headers.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Body template.
    #[serde(default)]
    pub body: Option<String>,

    /// Explicit variables. When present, no Environment is loaded.
    #[serde(default)]
    pub variables: Option<VariableMap>,

    /// Environment to load variables from.
    #[serde(default)]
    pub environment_id: Option<String>,

    /// Saved request this execution refers to (enables collection headers and scripts).
    #[serde(default)]
    pub request_id: Option<String>,

    /// Timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Whether TLS certificates are verified.
    #[serde(default)]
    pub ssl_verification: Option<bool>,

    /// Whether redirects are followed.
    #[serde(default)]
    pub follow_redirects: Option<bool>,

    /// Maximum response size in megabytes.
    #[serde(default)]
    pub max_response_size: Option<u64>,

    /// Pre-request script source; overrides the saved request's script.
    #[serde(default)]
    pub pre_request_script: Option<String>,

    /// Post-request script source; overrides the saved request's script.
    #[serde(default)]
    pub post_request_script: Option<String>,
}

/// Input validation failures for [`ExecuteInput`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Method is not one of the supported HTTP methods.
    UnsupportedMethod(String),
    /// URL is empty.
    MissingUrl,
    /// Timeout outside the accepted range.
    TimeoutOutOfRange(u64),
    /// Response size limit outside the accepted range.
    ResponseSizeOutOfRange(u64),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::UnsupportedMethod(method) => {
                write!(f, "Unsupported HTTP method: {}", method)
            }
            ValidationError::MissingUrl => write!(f, "URL is required"),
            ValidationError::TimeoutOutOfRange(ms) => write!(
                f,
                "Timeout must be between {} and {} ms, got {}",
                MIN_TIMEOUT_MS, MAX_TIMEOUT_MS, ms
            ),
            ValidationError::ResponseSizeOutOfRange(mb) => write!(
                f,
                "maxResponseSize must be between {} and {} MB, got {}",
                MAX_RESPONSE_SIZE_RANGE.start(),
                MAX_RESPONSE_SIZE_RANGE.end(),
                mb
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ExecuteInput {
    /// Creates a minimal input for the given method and URL.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Validates the payload and returns the parsed method.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first invalid field.
    pub fn validate(&self) -> Result<HttpMethod, ValidationError> {
        let method = HttpMethod::parse(&self.method)
            .ok_or_else(|| ValidationError::UnsupportedMethod(self.method.clone()))?;

        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingUrl);
        }

        if let Some(timeout) = self.timeout {
            if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout) {
                return Err(ValidationError::TimeoutOutOfRange(timeout));
            }
        }

        if let Some(size) = self.max_response_size {
            if !MAX_RESPONSE_SIZE_RANGE.contains(&size) {
                return Err(ValidationError::ResponseSizeOutOfRange(size));
            }
        }

        Ok(method)
    }
}

/// A fully resolved request plus the variables used to resolve it.
///
/// Built fresh for every execution; nothing here is shared between executions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub variables: VariableMap,
}

impl ExecutionContext {
    /// Gets a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
