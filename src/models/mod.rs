//! Data models shared across the engine.
//!
//! Requests, collections and execution payloads live here; environments and
//! history records live with their own modules.

pub mod collection;
pub mod request;
pub mod response;

pub use collection::Collection;
pub use request::{
    ExecuteInput, ExecutionContext, HttpMethod, RequestUpdate, SavedRequest, ValidationError,
};
pub use response::{ExecutionResult, ResponseBody};
