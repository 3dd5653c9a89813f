//! In-process storage backed by concurrent maps.
//!
//! Used by the bundled runner binary and by tests. Saved request updates hold the
//! map entry lock across compare and write, which makes the conditional update
//! atomic with respect to other writers.

use super::{Storage, StorageError};
use crate::environment::Environment;
use crate::history::HistoryRecord;
use crate::models::{Collection, RequestUpdate, SavedRequest};
use crate::variables::VariableMap;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Mutex;

/// Default maximum number of history entries retained per store.
pub const DEFAULT_MAX_HISTORY_ENTRIES: usize = 1000;

/// Concurrent in-memory [`Storage`] implementation.
#[derive(Debug)]
pub struct MemoryStorage {
    environments: DashMap<String, Environment>,
    collections: DashMap<String, Collection>,
    requests: DashMap<String, SavedRequest>,
    history: Mutex<Vec<HistoryRecord>>,
    max_history_entries: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Creates an empty store with the default history limit.
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_MAX_HISTORY_ENTRIES)
    }

    /// Creates an empty store keeping at most `max_entries` history records.
    /// The oldest records are dropped first.
    pub fn with_history_limit(max_entries: usize) -> Self {
        Self {
            environments: DashMap::new(),
            collections: DashMap::new(),
            requests: DashMap::new(),
            history: Mutex::new(Vec::new()),
            max_history_entries: max_entries,
        }
    }

    /// Seeds an environment, replacing any with the same id.
    pub fn insert_environment(&self, environment: Environment) {
        self.environments.insert(environment.id.clone(), environment);
    }

    /// Seeds a collection, replacing any with the same id.
    pub fn insert_collection(&self, collection: Collection) {
        self.collections.insert(collection.id.clone(), collection);
    }

    /// Seeds a saved request, replacing any with the same id.
    pub fn insert_request(&self, request: SavedRequest) {
        self.requests.insert(request.id.clone(), request);
    }

    /// Number of stored history records across all owners.
    pub fn history_len(&self) -> usize {
        self.history.lock().map(|h| h.len()).unwrap_or(0)
    }
}

/// Next modification timestamp; strictly later than `previous`.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn lock_error<T>(_: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Backend("history lock poisoned".to_string())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_environment(&self, id: &str) -> Result<Option<Environment>, StorageError> {
        Ok(self.environments.get(id).map(|env| env.clone()))
    }

    async fn find_environment_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Environment>, StorageError> {
        Ok(self
            .environments
            .iter()
            .find(|env| env.name == name)
            .map(|env| env.clone()))
    }

    async fn update_environment_variables(
        &self,
        id: &str,
        variables: &VariableMap,
    ) -> Result<(), StorageError> {
        let mut env = self
            .environments
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("Environment {}", id)))?;
        env.set_variables(variables);
        Ok(())
    }

    async fn get_request(&self, id: &str) -> Result<Option<SavedRequest>, StorageError> {
        Ok(self.requests.get(id).map(|r| r.clone()))
    }

    async fn get_collection(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<Collection>, StorageError> {
        Ok(self
            .collections
            .get(id)
            .filter(|c| c.owner_id == owner_id)
            .map(|c| c.clone()))
    }

    async fn update_request(
        &self,
        id: &str,
        updates: &RequestUpdate,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<SavedRequest, StorageError> {
        let mut entry = self
            .requests
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("Request {}", id)))?;

        if let Some(expected) = expected_updated_at {
            if entry.updated_at != expected {
                return Err(StorageError::Stale {
                    current: Box::new(entry.clone()),
                });
            }
        }

        updates.apply_to(&mut entry);
        entry.updated_at = next_timestamp(entry.updated_at);
        Ok(entry.clone())
    }

    async fn add_history(&self, record: HistoryRecord) -> Result<(), StorageError> {
        let mut history = self.history.lock().map_err(lock_error)?;
        history.push(record);
        if history.len() > self.max_history_entries {
            let excess = history.len() - self.max_history_entries;
            history.drain(..excess);
        }
        Ok(())
    }

    async fn list_history(&self, owner_id: &str) -> Result<Vec<HistoryRecord>, StorageError> {
        let history = self.history.lock().map_err(lock_error)?;
        Ok(history
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_history(&self, id: &str) -> Result<bool, StorageError> {
        let mut history = self.history.lock().map_err(lock_error)?;
        let before = history.len();
        history.retain(|r| r.id != id);
        Ok(history.len() != before)
    }

    async fn clear_history(&self, owner_id: &str) -> Result<usize, StorageError> {
        let mut history = self.history.lock().map_err(lock_error)?;
        let before = history.len();
        history.retain(|r| r.owner_id != owner_id);
        Ok(before - history.len())
    }
}
