//! Environment management module
//!
//! Environments are named variable sets held by the storage collaborator. Each
//! execution loads the effective variables once into its own local copy; the
//! stored Environment is never mutated implicitly by an execution.
//!
//! # Example
//!
//! ```no_run
//! use api_tester::environment::{load_variables, Environment};
//! use api_tester::storage::MemoryStorage;
//! use api_tester::variables::VariableMap;
//!
//! # async fn example() {
//! let storage = MemoryStorage::new();
//! let mut vars = VariableMap::new();
//! vars.insert("baseUrl".to_string(), "http://localhost:3000".to_string());
//! storage.insert_environment(Environment::with_variables("Local Environment", &vars));
//!
//! let loaded = load_variables(&storage, None, None, "Local Environment").await;
//! assert_eq!(loaded.variables.get("baseUrl").map(String::as_str), Some("http://localhost:3000"));
//! # }
//! ```

pub mod loader;
pub mod models;

pub use loader::{load_variables, LoadedVariables, VariableSource};
pub use models::{parse_environment_variables, Environment};
