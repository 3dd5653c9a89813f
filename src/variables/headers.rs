//! Collection-level header merging.
//!
//! Collections may carry a serialized header object that applies to every saved
//! request in them. Those headers sit underneath the caller's headers: on a name
//! collision (compared case-insensitively) the caller's value wins.
//!
//! Every failure on this path (missing request, missing collection, storage error,
//! malformed JSON) degrades to an empty header set.

use super::{resolve_header_values, string_map_from_json, VariableMap};
use crate::models::SavedRequest;
use crate::storage::Storage;
use log::{debug, warn};
use std::collections::HashMap;

/// Merges `overrides` on top of `base`. Keys of `base` matching an override key
/// case-insensitively are replaced.
pub fn merge_headers(
    base: &HashMap<String, String>,
    overrides: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut merged: HashMap<String, String> = base
        .iter()
        .filter(|(name, _)| !overrides.keys().any(|o| o.eq_ignore_ascii_case(name)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Parses a serialized header object. Non-string values are stringified.
///
/// # Errors
///
/// Returns the JSON error if `serialized` is not a JSON object.
pub fn parse_header_map(serialized: &str) -> Result<HashMap<String, String>, serde_json::Error> {
    string_map_from_json(serialized)
}

/// Looks up `request_id`, then its collection, and returns the collection headers
/// with variables resolved.
///
/// # Returns
///
/// The resolved collection headers, or an empty map on any failure.
pub async fn collection_headers(
    storage: &dyn Storage,
    owner_id: &str,
    request_id: &str,
    variables: &VariableMap,
) -> HashMap<String, String> {
    match storage.get_request(request_id).await {
        Ok(Some(request)) => headers_for_request(storage, owner_id, &request, variables).await,
        Ok(None) => {
            debug!("Saved request {} not found, no collection headers", request_id);
            HashMap::new()
        }
        Err(e) => {
            warn!("Failed to load saved request {}: {}", request_id, e);
            HashMap::new()
        }
    }
}

/// Collection headers for an already-loaded saved request.
pub async fn headers_for_request(
    storage: &dyn Storage,
    owner_id: &str,
    request: &SavedRequest,
    variables: &VariableMap,
) -> HashMap<String, String> {
    let collection = match storage.get_collection(owner_id, &request.collection_id).await {
        Ok(Some(collection)) => collection,
        Ok(None) => return HashMap::new(),
        Err(e) => {
            warn!(
                "Failed to load collection {} for request {}: {}",
                request.collection_id, request.id, e
            );
            return HashMap::new();
        }
    };

    let serialized = match collection.headers.as_deref() {
        Some(s) if !s.trim().is_empty() => s,
        _ => return HashMap::new(),
    };

    match parse_header_map(serialized) {
        Ok(headers) => resolve_header_values(&headers, variables),
        Err(e) => {
            warn!(
                "Ignoring malformed headers on collection {}: {}",
                collection.id, e
            );
            HashMap::new()
        }
    }
}
