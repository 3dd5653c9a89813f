//! API Tester execution engine
//!
//! This crate runs saved or ad-hoc HTTP requests the way an API-testing tool does:
//! placeholders are resolved from an environment, collection headers are merged
//! in, user scripts run before and after dispatch, and every execution is written
//! to history. Persistence is not part of the engine; it talks to a
//! [`storage::Storage`] implementation supplied by the host.
//!
//! # Architecture
//!
//! The engine is organized into several modules:
//!
//! - **models**: Saved requests, collections, execution payloads and results
//! - **variables**: `{{name}}` substitution and collection header merging
//! - **environment**: Environment model and per-execution variable loading
//! - **script**: Sandboxed Rhai pre/post-request scripts exposing a `pm` object
//! - **executor**: HTTP dispatch with classified transport errors
//! - **conflict**: Optimistic-concurrency updates of saved requests
//! - **history**: History records written after each execution
//! - **storage**: The storage collaborator trait and an in-memory implementation
//! - **config**: Engine configuration
//! - **runner**: The orchestrator tying all of the above together
//!
//! # Usage
//!
//! ```no_run
//! use api_tester::config::EngineConfig;
//! use api_tester::models::ExecuteInput;
//! use api_tester::runner::RequestRunner;
//! use api_tester::storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let runner = RequestRunner::new(Arc::new(MemoryStorage::new()), EngineConfig::default());
//!
//! let mut input = ExecuteInput::new("GET", "{{baseUrl}}/users");
//! input.variables = Some([("baseUrl".to_string(), "http://localhost:3000".to_string())].into());
//! input.post_request_script = Some(r#"pm.test("ok", || pm.response.to.have.status(200));"#.into());
//!
//! let outcome = runner.execute(input).await;
//! println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
//! # }
//! ```

pub mod config;
pub mod conflict;
pub mod environment;
pub mod executor;
pub mod history;
pub mod models;
pub mod runner;
pub mod script;
pub mod storage;
pub mod variables;

pub use config::{load_config, EngineConfig};
pub use conflict::{UpdateOutcome, UpdateRequestInput};
pub use models::{ExecuteInput, ExecutionResult};
pub use runner::{ExecuteOutcome, RequestRunner};
pub use storage::{MemoryStorage, Storage};
