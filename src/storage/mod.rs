//! Storage collaborator.
//!
//! The engine never owns persistence. Everything it reads or writes (environments,
//! saved requests, collections, history) goes through the [`Storage`] trait, so the
//! backing store can be a database, a remote service, or the bundled
//! [`MemoryStorage`].

pub mod memory;

pub use memory::MemoryStorage;

use crate::environment::Environment;
use crate::history::HistoryRecord;
use crate::models::{Collection, RequestUpdate, SavedRequest};
use crate::variables::VariableMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Errors raised by a storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// The addressed entity does not exist.
    NotFound(String),

    /// A compare-and-swap update lost the race; carries the stored version.
    Stale { current: Box<SavedRequest> },

    /// Backend-specific failure.
    Backend(String),

    /// Stored data could not be (de)serialized.
    Serialization(serde_json::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(what) => write!(f, "{} not found", what),
            StorageError::Stale { current } => write!(
                f,
                "Request {} was modified at {}",
                current.id,
                current.updated_at.to_rfc3339()
            ),
            StorageError::Backend(msg) => write!(f, "Storage error: {}", msg),
            StorageError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err)
    }
}

/// Persistence operations the engine depends on.
///
/// Implementations must be shareable across concurrent executions.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Loads an environment by id.
    async fn get_environment(&self, id: &str) -> Result<Option<Environment>, StorageError>;

    /// Loads the first environment with the given name.
    async fn find_environment_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Environment>, StorageError>;

    /// Replaces the variables of an environment.
    async fn update_environment_variables(
        &self,
        id: &str,
        variables: &VariableMap,
    ) -> Result<(), StorageError>;

    /// Loads a saved request by id.
    async fn get_request(&self, id: &str) -> Result<Option<SavedRequest>, StorageError>;

    /// Loads a collection belonging to `owner_id`.
    async fn get_collection(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<Collection>, StorageError>;

    /// Applies `updates` and bumps `updated_at`.
    ///
    /// When `expected_updated_at` is given the write is conditional: it fails with
    /// [`StorageError::Stale`] unless the stored timestamp still equals it. The
    /// comparison and the write happen atomically.
    async fn update_request(
        &self,
        id: &str,
        updates: &RequestUpdate,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<SavedRequest, StorageError>;

    /// Appends a history record.
    async fn add_history(&self, record: HistoryRecord) -> Result<(), StorageError>;

    /// Lists history records of `owner_id`, newest first.
    async fn list_history(&self, owner_id: &str) -> Result<Vec<HistoryRecord>, StorageError>;

    /// Deletes one history record. Returns whether it existed.
    async fn delete_history(&self, id: &str) -> Result<bool, StorageError>;

    /// Deletes all history of `owner_id`. Returns the number removed.
    async fn clear_history(&self, owner_id: &str) -> Result<usize, StorageError>;
}
