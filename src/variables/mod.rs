//! Variables module.
//!
//! Template substitution for URLs, header values and bodies, plus the
//! collection-level header merge that runs before substitution.

pub mod headers;
pub mod substitution;

pub use headers::{collection_headers, headers_for_request, merge_headers, parse_header_map};
pub use substitution::{
    resolve_header_values, resolve_optional, resolve_variables, unresolved_placeholders,
};

use serde_json::Value;
use std::collections::HashMap;

/// Variable name to string value.
pub type VariableMap = HashMap<String, String>;

/// Parses a serialized JSON object into a string map.
///
/// Strings are taken as-is, numbers and booleans are stringified and `null`
/// entries are dropped. Nested arrays/objects are kept as compact JSON.
///
/// # Errors
///
/// Returns the JSON error when `serialized` is not a JSON object.
pub fn string_map_from_json(serialized: &str) -> Result<HashMap<String, String>, serde_json::Error> {
    let object: serde_json::Map<String, Value> = serde_json::from_str(serialized)?;

    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}
