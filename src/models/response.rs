//! Response-side data models.
//!
//! The response body is classified once, at the HTTP executor boundary, into a
//! [`ResponseBody`] tagged union. Scripting and history recording consume that
//! classification instead of re-inspecting the payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Response body, decided once by the executor.
///
/// Serialized untagged, so JSON consumers see either a string or a JSON value.
/// Deserializing maps a string back to `Text` and any other value to `Json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Structured body parsed from JSON.
    Json(Value),
    /// Raw text body.
    Text(String),
}

impl<'de> Deserialize<'de> for ResponseBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => ResponseBody::Text(text),
            value => ResponseBody::Json(value),
        })
    }
}

impl ResponseBody {
    /// Classifies a raw body using the response content type.
    ///
    /// A JSON content type (`application/json`, `*+json`) yields `Json` when the
    /// text parses. Without any content type, text that parses as a JSON object or
    /// array is also treated as structured. Everything else stays `Text`.
    pub fn classify(text: String, content_type: Option<&str>) -> Self {
        let declared_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);
        let looks_structured = content_type.is_none() && {
            let trimmed = text.trim_start();
            trimmed.starts_with('{') || trimmed.starts_with('[')
        };

        if declared_json || looks_structured {
            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                return ResponseBody::Json(value);
            }
        }

        ResponseBody::Text(text)
    }

    /// Returns the body as text; structured bodies are serialized compactly.
    pub fn to_text(&self) -> String {
        match self {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
        }
    }

    /// Returns the structured form, parsing text lazily. `None` when text is not JSON.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value.clone()),
            ResponseBody::Text(text) => serde_json::from_str(text).ok(),
        }
    }

    /// Whether the body was classified as structured.
    pub fn is_json(&self) -> bool {
        matches!(self, ResponseBody::Json(_))
    }
}

/// Normalized outcome of dispatching one HTTP request.
///
/// Any received status code is `success: true`; only transport failures set
/// `success: false` together with `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,

    /// Response headers without `Set-Cookie`; repeated headers joined with `, `.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,

    /// Raw `Set-Cookie` values, in received order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,

    /// Wall-clock milliseconds from dispatch to completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Creates a failed result carrying only an error message and elapsed time.
    pub fn failure(error: impl Into<String>, time: Option<u64>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            time,
            ..Self::default()
        }
    }

    /// Gets a response header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }
}
