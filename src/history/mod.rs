//! Execution history records.
//!
//! The engine writes one record per execution through the storage collaborator.
//! Writing is best effort: a failed write is logged and never reaches the caller.

pub mod models;

pub use models::{HistoryRecord, MAX_RESPONSE_BODY_SIZE, SENSITIVE_HEADERS};
