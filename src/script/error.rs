//! Script execution error types.

use rhai::EvalAltResult;
use std::fmt;

/// Errors that abort a script phase.
///
/// Failures inside a `pm.test` callback are not errors; they are recorded as
/// failed tests.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The script did not compile.
    Parse(String),

    /// The script raised an error outside a test callback.
    Runtime(String),

    /// The script exceeded its wall-clock budget.
    Timeout { budget_ms: u64 },

    /// The script hit an interpreter resource limit.
    LimitExceeded(String),

    /// The worker running the script failed.
    Worker(String),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Parse(msg) => write!(f, "Script syntax error: {}", msg),
            ScriptError::Runtime(msg) => write!(f, "{}", msg),
            ScriptError::Timeout { budget_ms } => {
                write!(f, "Script execution timed out after {}ms", budget_ms)
            }
            ScriptError::LimitExceeded(msg) => write!(f, "Script resource limit exceeded: {}", msg),
            ScriptError::Worker(msg) => write!(f, "Script worker failed: {}", msg),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<rhai::ParseError> for ScriptError {
    fn from(err: rhai::ParseError) -> Self {
        ScriptError::Parse(err.to_string())
    }
}

impl ScriptError {
    /// Converts an engine evaluation error.
    ///
    /// Thrown values keep their own text so that `throw "boom"` surfaces as `boom`.
    pub fn from_eval(err: &EvalAltResult, budget_ms: u64) -> Self {
        match err.unwrap_inner() {
            EvalAltResult::ErrorTerminated(..) => ScriptError::Timeout { budget_ms },
            EvalAltResult::ErrorTooManyOperations(..)
            | EvalAltResult::ErrorStackOverflow(..)
            | EvalAltResult::ErrorDataTooLarge(..)
            | EvalAltResult::ErrorTooManyModules(..) => {
                ScriptError::LimitExceeded(err.unwrap_inner().to_string())
            }
            EvalAltResult::ErrorRuntime(value, _) => ScriptError::Runtime(value.to_string()),
            other => ScriptError::Runtime(other.to_string()),
        }
    }
}
