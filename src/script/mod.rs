//! Pre- and post-request scripting.
//!
//! Scripts are written in Rhai and address a fixed capability object named `pm`:
//!
//! ```text
//! pm.environment.set("token", "abc");        // also get / unset
//! pm.variables.get("token");
//! pm.request.headers.add("Authorization", "Bearer " + pm.environment.get("token"));
//! pm.request.body.update("{\"page\":2}");
//! pm.test("status ok", || pm.response.to.have.status(200));
//! pm.test("has id", || pm.response.to.have.jsonBody("id"));
//! let id = pm.response.json().id;
//! ```
//!
//! Each phase works on local copies. A phase that raises an error outside a
//! `pm.test` callback is aborted and its mutations are discarded. Every phase runs
//! under a wall-clock budget on a blocking worker thread.

pub mod api;
pub mod error;
pub mod sandbox;

pub use error::ScriptError;
pub use sandbox::{
    run_post_request_isolated, run_post_request_script, run_pre_request_isolated,
    run_pre_request_script, SandboxLimits,
};

use crate::models::ExecutionContext;
use crate::variables::VariableMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The request as seen by a pre-request script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Input and output of the pre-request phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptContext {
    pub environment: VariableMap,
    pub request: ScriptRequest,
}

impl ScriptContext {
    /// Builds the script view of a resolved execution context.
    pub fn from_execution(context: &ExecutionContext) -> Self {
        Self {
            environment: context.variables.clone(),
            request: ScriptRequest {
                method: context.method.as_str().to_string(),
                url: context.url.clone(),
                headers: context.headers.clone(),
                body: context.body.clone(),
            },
        }
    }

    /// Applies this script view back onto an execution context.
    ///
    /// The method cannot be changed by scripts and is kept from `context`.
    pub fn apply_to(self, context: &mut ExecutionContext) {
        context.url = self.request.url;
        context.headers = self.request.headers;
        context.body = self.request.body;
        context.variables = self.environment;
    }
}

/// Result of the pre-request phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreScriptOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Mutated context on success, the input context on failure.
    pub context: ScriptContext,
}

impl PreScriptOutcome {
    pub(crate) fn ok(context: ScriptContext) -> Self {
        Self {
            success: true,
            error: None,
            context,
        }
    }

    pub(crate) fn failed(error: ScriptError, context: ScriptContext) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            context,
        }
    }
}

/// Result of the post-request phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostScriptOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Mutated environment on success, the input environment on failure.
    pub environment: VariableMap,
    /// Named test outcomes.
    pub tests: BTreeMap<String, bool>,
}

impl PostScriptOutcome {
    pub(crate) fn ok(environment: VariableMap, tests: BTreeMap<String, bool>) -> Self {
        Self {
            success: true,
            error: None,
            environment,
            tests,
        }
    }

    pub(crate) fn failed(
        error: ScriptError,
        environment: VariableMap,
        tests: BTreeMap<String, bool>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            environment,
            tests,
        }
    }
}
