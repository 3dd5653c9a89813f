//! Caller-facing result of one execution.

use crate::models::ExecutionResult;
use crate::variables::VariableMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The executor result plus whatever the scripts reported.
///
/// Serializes flat: `{success, status?, statusText?, headers?, cookies?, body?,
/// time?, error?, preRequestError?, postRequestError?, tests?, environment?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOutcome {
    #[serde(flatten)]
    pub result: ExecutionResult,

    /// Error raised by the pre-request script; the request went out unmodified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request_error: Option<String>,

    /// Error raised by the post-request script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_request_error: Option<String>,

    /// Named test outcomes from the post-request script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<BTreeMap<String, bool>>,

    /// Environment after scripting, present when a script ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<VariableMap>,
}

impl ExecuteOutcome {
    /// An outcome carrying only an error.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::from(ExecutionResult::failure(error, None))
    }

    /// Whether a response was received.
    pub fn is_success(&self) -> bool {
        self.result.success
    }

    /// Whether every recorded test passed. `true` when no tests ran.
    pub fn all_tests_passed(&self) -> bool {
        self.tests
            .as_ref()
            .map(|tests| tests.values().all(|passed| *passed))
            .unwrap_or(true)
    }
}

impl From<ExecutionResult> for ExecuteOutcome {
    fn from(result: ExecutionResult) -> Self {
        Self {
            result,
            pre_request_error: None,
            post_request_error: None,
            tests: None,
            environment: None,
        }
    }
}
