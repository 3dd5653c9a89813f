//! Script engine setup and phase execution.

use super::api::{self, PmApi};
use super::error::ScriptError;
use super::{PostScriptOutcome, PreScriptOutcome, ScriptContext};
use crate::config::EngineConfig;
use crate::models::ExecutionResult;
use crate::variables::VariableMap;
use log::{debug, warn};
use rhai::{Dynamic, Engine, Scope};
use std::time::{Duration, Instant};

/// Extra time granted to the worker beyond the script budget before the caller
/// stops waiting for it.
const WORKER_GRACE: Duration = Duration::from_millis(250);

/// Name scripts use for the capability object.
const PM_VARIABLE: &str = "pm";

/// Resource limits for one script phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    /// Wall-clock budget.
    pub timeout: Duration,
    /// Optional cap on interpreter operations.
    pub max_operations: Option<u64>,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SandboxLimits {
    /// Limits configured on the engine.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            timeout: config.script_timeout_duration(),
            max_operations: config.script_max_operations,
        }
    }

    fn budget_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Builds a sandboxed engine: no `eval`, bounded nesting and data sizes, output
/// routed to the log, and a progress hook enforcing the wall-clock budget.
fn build_engine(limits: &SandboxLimits) -> Engine {
    let mut engine = Engine::new();

    engine.disable_symbol("eval");
    engine.set_max_call_levels(32);
    engine.set_max_expr_depths(64, 32);
    engine.set_max_string_size(1024 * 1024);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(10_000);
    if let Some(max) = limits.max_operations {
        engine.set_max_operations(max);
    }

    engine.on_print(|text| debug!("script: {}", text));
    engine.on_debug(|text, _source, pos| debug!("script debug at {}: {}", pos, text));

    let started = Instant::now();
    let budget = limits.timeout;
    engine.on_progress(move |_ops| {
        if started.elapsed() > budget {
            Some("script timeout".into())
        } else {
            None
        }
    });

    api::register(&mut engine);
    engine
}

/// Compiles and runs `script` with `pm` resolved by the engine.
///
/// `pm` stays out of the scope so closures passed to `pm.test` never capture it.
/// Every lookup yields a fresh shared handle over the same local copies.
fn run(script: &str, pm: &PmApi, limits: &SandboxLimits) -> Result<(), ScriptError> {
    let mut engine = build_engine(limits);
    let handle = pm.clone();
    engine.on_var(move |name, _index, _context| {
        if name == PM_VARIABLE {
            Ok(Some(Dynamic::from(handle.clone()).into_shared()))
        } else {
            Ok(None)
        }
    });

    let ast = engine.compile(script)?;
    engine
        .run_ast_with_scope(&mut Scope::new(), &ast)
        .map_err(|e| ScriptError::from_eval(&e, limits.budget_ms()))
}

/// Runs a pre-request script against local copies of the environment and request.
///
/// On success the returned context carries the script's mutations. On failure the
/// input context is returned unchanged.
pub fn run_pre_request_script(
    script: &str,
    context: &ScriptContext,
    limits: &SandboxLimits,
) -> PreScriptOutcome {
    if script.trim().is_empty() {
        return PreScriptOutcome::ok(context.clone());
    }

    let pm = PmApi::for_pre_request(context.environment.clone(), context.request.clone());
    match run(script, &pm, limits) {
        Ok(()) => {
            let request = pm
                .request_snapshot()
                .unwrap_or_else(|| context.request.clone());
            PreScriptOutcome::ok(ScriptContext {
                environment: pm.environment_snapshot(),
                request,
            })
        }
        Err(e) => {
            warn!("Pre-request script failed: {}", e);
            PreScriptOutcome::failed(e, context.clone())
        }
    }
}

/// Runs a post-request script against a local copy of the environment and a
/// read-only view of the response.
///
/// On failure the input environment is returned together with the tests recorded
/// before the failure.
pub fn run_post_request_script(
    script: &str,
    environment: &VariableMap,
    result: &ExecutionResult,
    limits: &SandboxLimits,
) -> PostScriptOutcome {
    if script.trim().is_empty() {
        return PostScriptOutcome::ok(environment.clone(), Default::default());
    }

    let pm = PmApi::for_post_request(environment.clone(), result);
    match run(script, &pm, limits) {
        Ok(()) => PostScriptOutcome::ok(pm.environment_snapshot(), pm.tests_snapshot()),
        Err(e) => {
            warn!("Post-request script failed: {}", e);
            PostScriptOutcome::failed(e, environment.clone(), pm.tests_snapshot())
        }
    }
}

/// Runs the pre-request phase on a blocking worker thread.
///
/// The caller waits at most the script budget plus a short grace period.
pub async fn run_pre_request_isolated(
    script: String,
    context: ScriptContext,
    limits: SandboxLimits,
) -> PreScriptOutcome {
    let fallback = context.clone();
    let worker =
        tokio::task::spawn_blocking(move || run_pre_request_script(&script, &context, &limits));

    match tokio::time::timeout(limits.timeout + WORKER_GRACE, worker).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => {
            PreScriptOutcome::failed(ScriptError::Worker(join_error.to_string()), fallback)
        }
        Err(_) => PreScriptOutcome::failed(
            ScriptError::Timeout {
                budget_ms: limits.budget_ms(),
            },
            fallback,
        ),
    }
}

/// Runs the post-request phase on a blocking worker thread.
pub async fn run_post_request_isolated(
    script: String,
    environment: VariableMap,
    result: ExecutionResult,
    limits: SandboxLimits,
) -> PostScriptOutcome {
    let fallback = environment.clone();
    let worker = tokio::task::spawn_blocking(move || {
        run_post_request_script(&script, &environment, &result, &limits)
    });

    match tokio::time::timeout(limits.timeout + WORKER_GRACE, worker).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => PostScriptOutcome::failed(
            ScriptError::Worker(join_error.to_string()),
            fallback,
            Default::default(),
        ),
        Err(_) => PostScriptOutcome::failed(
            ScriptError::Timeout {
                budget_ms: limits.budget_ms(),
            },
            fallback,
            Default::default(),
        ),
    }
}
