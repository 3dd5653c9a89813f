//! Optimistic-concurrency gate for saved request updates.
//!
//! A caller that read a request at timestamp `T0` sends `expectedUpdatedAt = T0`
//! with its update. If the stored timestamp is no longer exactly `T0`, the update is
//! rejected with the current stored version so the caller can reconcile. Setting
//! `forceOverwrite` skips the check; omitting `expectedUpdatedAt` requests no
//! conflict semantics at all.
//!
//! A mismatch found on read is rejected without writing. The write itself still
//! carries the guard to [`Storage::update_request`], which compares and writes
//! atomically, so concurrent writers cannot both pass.

use crate::models::{RequestUpdate, SavedRequest};
use crate::storage::{Storage, StorageError};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Payload of the conflict-aware update entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestInput {
    /// Saved request to update.
    pub id: String,

    /// Fields to change.
    #[serde(default)]
    pub updates: RequestUpdate,

    /// Timestamp the caller last observed.
    #[serde(default)]
    pub expected_updated_at: Option<DateTime<Utc>>,

    /// Apply the update even when the timestamps differ.
    #[serde(default)]
    pub force_overwrite: bool,
}

/// Outcome of a conflict-aware update.
///
/// Serializes to `{success: true, request}`, `{success: false, conflict: true,
/// serverVersion}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The update was applied.
    Updated { request: SavedRequest },
    /// The stored version moved on since the caller read it.
    Conflict { server_version: SavedRequest },
    /// The update failed for another reason.
    Failed { error: String },
}

impl UpdateOutcome {
    /// Whether the update was applied.
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Updated { .. })
    }

    /// Whether the update was rejected as a conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, UpdateOutcome::Conflict { .. })
    }
}

impl Serialize for UpdateOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            UpdateOutcome::Updated { request } => {
                let mut state = serializer.serialize_struct("UpdateOutcome", 2)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("request", request)?;
                state.end()
            }
            UpdateOutcome::Conflict { server_version } => {
                let mut state = serializer.serialize_struct("UpdateOutcome", 3)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("conflict", &true)?;
                state.serialize_field("serverVersion", server_version)?;
                state.end()
            }
            UpdateOutcome::Failed { error } => {
                let mut state = serializer.serialize_struct("UpdateOutcome", 2)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
                state.end()
            }
        }
    }
}

/// Decides whether an update must be rejected.
///
/// Returns `true` only when a timestamp was asserted, it differs from `stored`,
/// and overwriting was not forced. Equality is exact.
pub fn detect_conflict(
    stored: DateTime<Utc>,
    expected: Option<DateTime<Utc>>,
    force_overwrite: bool,
) -> bool {
    match expected {
        Some(expected) if !force_overwrite => expected != stored,
        _ => false,
    }
}

/// Applies an update under the optimistic-concurrency protocol.
///
/// Never returns an error: failures are reported through [`UpdateOutcome`].
pub async fn update_request_checked(
    storage: &dyn Storage,
    input: UpdateRequestInput,
) -> UpdateOutcome {
    let guard = if input.force_overwrite {
        None
    } else {
        input.expected_updated_at
    };

    if guard.is_some() {
        match storage.get_request(&input.id).await {
            Ok(Some(current))
                if detect_conflict(current.updated_at, guard, input.force_overwrite) =>
            {
                info!(
                    "Update conflict on request {}: expected {:?}, stored {}",
                    input.id, input.expected_updated_at, current.updated_at
                );
                return UpdateOutcome::Conflict {
                    server_version: current,
                };
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read request {}: {}", input.id, e);
                return UpdateOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }
    }

    // The guarded write re-checks atomically; a writer may have slipped in.
    match storage.update_request(&input.id, &input.updates, guard).await {
        Ok(request) => {
            debug!("Updated request {} at {}", request.id, request.updated_at);
            UpdateOutcome::Updated { request }
        }
        Err(StorageError::Stale { current }) => {
            info!(
                "Update conflict on request {}: expected {:?}, stored {}",
                input.id, input.expected_updated_at, current.updated_at
            );
            UpdateOutcome::Conflict {
                server_version: *current,
            }
        }
        Err(e) => {
            warn!("Failed to update request {}: {}", input.id, e);
            UpdateOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}
