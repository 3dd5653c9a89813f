//! HTTP request execution.
//!
//! Dispatches one fully resolved request and normalizes the outcome into an
//! [`ExecutionResult`](crate::models::ExecutionResult). Any received status code is
//! a successful execution. Transport failures are classified into timeout, DNS,
//! connection refused, size limit and generic network errors, and reported as the
//! result's `error` string together with the elapsed time.

pub mod config;
pub mod error;
pub mod native;

pub use config::HttpOptions;
pub use error::TransportError;
pub use native::execute_request;
