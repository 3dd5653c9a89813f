//! API Tester command-line runner
//!
//! Runs one execution (or one conflict-aware update) against an in-memory store
//! seeded from a JSON document, and prints the outcome as JSON on stdout.
//!
//! # Input
//!
//! The document is read from the file named by the first argument, or from stdin:
//!
//! ```text
//! {
//!   "settings": { "api-tester": { "timeout": 5000 } },
//!   "environments": [ { "id": "env-1", "name": "Local Environment", "variables": "{\"baseUrl\":\"http://localhost:3000\"}" } ],
//!   "collections": [ ... ],
//!   "requests": [ ... ],
//!   "execute": { "method": "GET", "url": "{{baseUrl}}/health" }
//! }
//! ```
//!
//! Use `"update"` instead of `"execute"` to run a conflict-aware update.
//!
//! # Logging
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.
//!
//! # Exit status
//!
//! `0` when the request got a response and every script test passed (or the update
//! was applied), `1` otherwise, `2` when the input document is unusable.

use api_tester::config::load_config;
use api_tester::conflict::UpdateRequestInput;
use api_tester::environment::Environment;
use api_tester::models::{Collection, ExecuteInput, SavedRequest};
use api_tester::runner::RequestRunner;
use api_tester::storage::MemoryStorage;
use log::{debug, error};
use serde::Deserialize;
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunDocument {
    #[serde(default)]
    settings: Option<serde_json::Value>,
    #[serde(default)]
    environments: Vec<Environment>,
    #[serde(default)]
    collections: Vec<Collection>,
    #[serde(default)]
    requests: Vec<SavedRequest>,
    #[serde(default)]
    execute: Option<ExecuteInput>,
    #[serde(default)]
    update: Option<UpdateRequestInput>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let document = match read_document() {
        Ok(document) => document,
        Err(e) => {
            error!("{}", e);
            eprintln!("[api-tester] {}", e);
            return ExitCode::from(2);
        }
    };

    let config = load_config(document.settings);
    debug!("Loaded configuration: {:?}", config);

    let storage = Arc::new(MemoryStorage::new());
    for environment in document.environments {
        storage.insert_environment(environment);
    }
    for collection in document.collections {
        storage.insert_collection(collection);
    }
    for request in document.requests {
        storage.insert_request(request);
    }

    let runner = RequestRunner::new(storage, config);

    let (printed, passed) = match (document.execute, document.update) {
        (Some(input), _) => {
            let outcome = runner.execute(input).await;
            let passed = outcome.is_success() && outcome.all_tests_passed();
            (serde_json::to_string_pretty(&outcome), passed)
        }
        (None, Some(input)) => {
            let outcome = runner.update_request(input).await;
            let passed = outcome.is_success();
            (serde_json::to_string_pretty(&outcome), passed)
        }
        (None, None) => {
            eprintln!("[api-tester] Input document has neither \"execute\" nor \"update\"");
            return ExitCode::from(2);
        }
    };

    match printed {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("[api-tester] Failed to serialize outcome: {}", e);
            return ExitCode::from(2);
        }
    }

    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Reads the input document from the path given as first argument, or stdin.
fn read_document() -> Result<RunDocument, String> {
    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path, e))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            buffer
        }
    };

    serde_json::from_str(&raw).map_err(|e| format!("Invalid input document: {}", e))
}
