//! Data models for execution history.
//!
//! One [`HistoryRecord`] is written per execution, after dispatch and scripting.
//! Headers are stored serialized; structured response bodies are stored as
//! compact JSON text.

use crate::models::{ExecutionContext, ExecutionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum response body size to store in history (1MB).
///
/// Larger bodies are dropped from the record when `dropLargeHistoryBodies` is enabled.
pub const MAX_RESPONSE_BODY_SIZE: usize = 1_048_576;

/// Sensitive header names removed before storage when sanitization is enabled.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "api-key",
    "auth-token",
    "x-auth-token",
    "access-token",
    "x-access-token",
    "proxy-authorization",
];

/// A persisted log entry for one executed request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// User the execution ran as.
    pub owner_id: String,

    pub method: String,
    pub url: String,

    /// Response status; 0 when no response was received.
    pub status: u16,

    /// Elapsed milliseconds.
    pub duration: u64,

    /// Serialized request header mapping.
    pub request_headers: String,
    pub request_body: String,

    /// Serialized response header mapping.
    pub response_headers: String,
    pub response_body: String,

    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Builds a record from the effective request and the executor result.
    pub fn from_execution(
        owner_id: impl Into<String>,
        context: &ExecutionContext,
        result: &ExecutionResult,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            method: context.method.as_str().to_string(),
            url: context.url.clone(),
            status: result.status.unwrap_or(0),
            duration: result.time.unwrap_or(0),
            request_headers: serialize_headers(&context.headers),
            request_body: context.body.clone().unwrap_or_default(),
            response_headers: result
                .headers
                .as_ref()
                .map(serialize_headers)
                .unwrap_or_else(|| "{}".to_string()),
            response_body: result
                .body
                .as_ref()
                .map(|body| body.to_text())
                .unwrap_or_default(),
            created_at: Utc::now(),
        }
    }

    /// Removes sensitive headers from both serialized header sets.
    pub fn sanitize_headers(mut self) -> Self {
        self.request_headers = strip_sensitive(&self.request_headers);
        self.response_headers = strip_sensitive(&self.response_headers);
        self
    }

    /// Replaces the response body with an empty string when it exceeds
    /// [`MAX_RESPONSE_BODY_SIZE`]. The body is dropped whole, not cut.
    pub fn drop_large_response_body(mut self) -> Self {
        if self.response_body.len() > MAX_RESPONSE_BODY_SIZE {
            self.response_body = String::new();
        }
        self
    }

    /// Prepares the record for storage.
    ///
    /// # Arguments
    ///
    /// * `sanitize_sensitive` - Whether to remove sensitive headers
    /// * `drop_large_body` - Whether to drop response bodies over the size limit
    pub fn prepare_for_storage(self, sanitize_sensitive: bool, drop_large_body: bool) -> Self {
        let record = if sanitize_sensitive {
            self.sanitize_headers()
        } else {
            self
        };
        if drop_large_body {
            record.drop_large_response_body()
        } else {
            record
        }
    }
}

fn serialize_headers(headers: &HashMap<String, String>) -> String {
    serde_json::to_string(headers).unwrap_or_else(|_| "{}".to_string())
}

fn strip_sensitive(serialized: &str) -> String {
    let mut headers: HashMap<String, String> = match serde_json::from_str(serialized) {
        Ok(headers) => headers,
        Err(_) => return serialized.to_string(),
    };
    headers.retain(|key, _| {
        !SENSITIVE_HEADERS
            .iter()
            .any(|sensitive| key.eq_ignore_ascii_case(sensitive))
    });
    serialize_headers(&headers)
}
