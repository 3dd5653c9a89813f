//! Integration tests module for the API Tester engine
//!
//! Shared helpers for driving [`RequestRunner`] against a wiremock server and an
//! in-memory store.

pub mod conflict_test;
pub mod execution_test;
pub mod scripting_test;

use api_tester::config::EngineConfig;
use api_tester::runner::RequestRunner;
use api_tester::storage::MemoryStorage;
use std::collections::HashMap;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Runner over a fresh in-memory store with default configuration.
pub fn runner() -> (RequestRunner, Arc<MemoryStorage>) {
    runner_with_config(EngineConfig::default())
}

/// Runner over a fresh in-memory store.
pub fn runner_with_config(config: EngineConfig) -> (RequestRunner, Arc<MemoryStorage>) {
    init_test_env();
    let storage = Arc::new(MemoryStorage::new());
    (RequestRunner::new(storage.clone(), config), storage)
}

/// Builds a variable map from pairs.
pub fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
