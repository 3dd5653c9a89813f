//! Execution orchestration.
//!
//! [`RequestRunner`] sequences one execution:
//!
//! 1. validate the input
//! 2. load the effective variables (caller, environment by id, or default environment)
//! 3. merge collection headers when a saved request is referenced
//! 4. resolve placeholders in url, header values and body
//! 5. run the pre-request script
//! 6. dispatch the request
//! 7. run the post-request script
//! 8. write a history record
//!
//! Every step degrades instead of failing where it can. The pipeline runs in its own
//! task, so even a panic inside it comes back as `{success: false, error}`.

mod outcome;

pub use outcome::ExecuteOutcome;

use crate::config::EngineConfig;
use crate::conflict::{update_request_checked, UpdateOutcome, UpdateRequestInput};
use crate::environment::{load_variables, LoadedVariables};
use crate::executor::{execute_request, HttpOptions};
use crate::history::HistoryRecord;
use crate::models::{ExecuteInput, ExecutionContext, ExecutionResult, SavedRequest};
use crate::script::{
    run_post_request_isolated, run_pre_request_isolated, PostScriptOutcome, SandboxLimits,
    ScriptContext,
};
use crate::storage::{Storage, StorageError};
use crate::variables::{
    headers_for_request, merge_headers, resolve_header_values, resolve_optional,
    resolve_variables, unresolved_placeholders,
};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Runs executions and conflict-aware updates against a storage collaborator.
///
/// Cheap to clone; clones share the storage and configuration.
#[derive(Clone)]
pub struct RequestRunner {
    storage: Arc<dyn Storage>,
    config: Arc<EngineConfig>,
}

impl std::fmt::Debug for RequestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestRunner {
    /// Creates a runner.
    ///
    /// # Arguments
    ///
    /// * `storage` - Storage collaborator shared by all executions
    /// * `config` - Engine configuration
    pub fn new(storage: Arc<dyn Storage>, config: EngineConfig) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }

    /// The configuration this runner was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes one request.
    ///
    /// Never fails and never panics to the caller: validation errors, transport
    /// failures and internal faults all come back as `success: false` with an
    /// `error` message.
    pub async fn execute(&self, input: ExecuteInput) -> ExecuteOutcome {
        let runner = self.clone();
        let task = tokio::spawn(async move { runner.run_pipeline(input).await });

        match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!("Execution task failed: {}", join_error);
                ExecuteOutcome::failure(format!("Execution failed: {}", join_error))
            }
        }
    }

    /// Applies a conflict-aware update to a saved request.
    pub async fn update_request(&self, input: UpdateRequestInput) -> UpdateOutcome {
        update_request_checked(self.storage.as_ref(), input).await
    }

    /// History of the configured user, newest first.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the history cannot be read.
    pub async fn history(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        self.storage.list_history(&self.config.user_id).await
    }

    /// Deletes all history of the configured user. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the history cannot be cleared.
    pub async fn clear_history(&self) -> Result<usize, StorageError> {
        self.storage.clear_history(&self.config.user_id).await
    }

    async fn run_pipeline(&self, input: ExecuteInput) -> ExecuteOutcome {
        let method = match input.validate() {
            Ok(method) => method,
            Err(e) => {
                debug!("Rejected execution input: {}", e);
                return ExecuteOutcome::failure(e.to_string());
            }
        };

        let loaded = load_variables(
            self.storage.as_ref(),
            input.variables.as_ref(),
            input.environment_id.as_deref(),
            &self.config.default_environment_name,
        )
        .await;
        let variables = &loaded.variables;

        let saved = match input.request_id.as_deref() {
            Some(id) => self.load_saved_request(id).await,
            None => None,
        };

        let collection = match &saved {
            Some(request) => {
                headers_for_request(self.storage.as_ref(), &self.config.user_id, request, variables)
                    .await
            }
            None => HashMap::new(),
        };
        let defaults = resolve_header_values(&self.config.default_headers, variables);
        let caller = resolve_header_values(&input.headers.clone().unwrap_or_default(), variables);
        let headers = merge_headers(&merge_headers(&defaults, &collection), &caller);

        let url = resolve_variables(&input.url, variables);
        let unresolved = unresolved_placeholders(&url, variables);
        if !unresolved.is_empty() {
            debug!("Unresolved placeholders in url: {:?}", unresolved);
        }

        let mut context = ExecutionContext {
            method,
            url,
            headers,
            body: resolve_optional(input.body.as_deref(), variables),
            variables: variables.clone(),
        };

        let limits = SandboxLimits::from_config(&self.config);
        let mut outcome_extras = ScriptReport::default();

        if let Some(script) = script_source(input.pre_request_script.as_ref(), &saved, |r| {
            r.pre_request_script.as_ref()
        }) {
            let pre = run_pre_request_isolated(
                script,
                ScriptContext::from_execution(&context),
                limits,
            )
            .await;
            if pre.success {
                pre.context.apply_to(&mut context);
            } else {
                outcome_extras.pre_request_error = pre.error;
            }
            outcome_extras.environment = Some(context.variables.clone());
        }

        let options = HttpOptions::from_config(&self.config).with_overrides(&input);
        let result = execute_request(&context, &options).await;
        info!(
            "{} {} -> {}",
            context.method,
            context.url,
            result
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| result.error.clone().unwrap_or_default())
        );

        if let Some(script) = script_source(input.post_request_script.as_ref(), &saved, |r| {
            r.post_request_script.as_ref()
        }) {
            let post =
                run_post_request_isolated(script, context.variables.clone(), result.clone(), limits)
                    .await;
            outcome_extras.apply_post(post);
        }

        if let Some(environment) = &outcome_extras.environment {
            self.persist_environment(&loaded, environment).await;
        }

        self.record_history(&context, &result).await;

        outcome_extras.into_outcome(result)
    }

    async fn load_saved_request(&self, id: &str) -> Option<SavedRequest> {
        match self.storage.get_request(id).await {
            Ok(found) => {
                if found.is_none() {
                    debug!("Saved request {} not found", id);
                }
                found
            }
            Err(e) => {
                warn!("Failed to load saved request {}: {}", id, e);
                None
            }
        }
    }

    /// Writes script environment changes back when configured to.
    async fn persist_environment(&self, loaded: &LoadedVariables, environment: &HashMap<String, String>) {
        if !self.config.persist_script_environment || environment == &loaded.variables {
            return;
        }
        let Some(id) = loaded.environment_id() else {
            return;
        };
        if let Err(e) = self.storage.update_environment_variables(id, environment).await {
            warn!("Failed to persist script environment changes to {}: {}", id, e);
        }
    }

    async fn record_history(&self, context: &ExecutionContext, result: &ExecutionResult) {
        let record = HistoryRecord::from_execution(&self.config.user_id, context, result)
            .prepare_for_storage(
                self.config.sanitize_history_headers,
                self.config.drop_large_history_bodies,
            );
        if let Err(e) = self.storage.add_history(record).await {
            warn!("Failed to save history record: {}", e);
        }
    }
}

/// Picks the explicit script, else the saved request's. Blank scripts count as absent.
fn script_source<F>(
    explicit: Option<&String>,
    saved: &Option<SavedRequest>,
    from_saved: F,
) -> Option<String>
where
    F: Fn(&SavedRequest) -> Option<&String>,
{
    explicit
        .or_else(|| saved.as_ref().and_then(from_saved))
        .filter(|script| !script.trim().is_empty())
        .cloned()
}

/// Script results gathered along the pipeline.
#[derive(Debug, Default)]
struct ScriptReport {
    pre_request_error: Option<String>,
    post_request_error: Option<String>,
    tests: Option<std::collections::BTreeMap<String, bool>>,
    environment: Option<HashMap<String, String>>,
}

impl ScriptReport {
    fn apply_post(&mut self, post: PostScriptOutcome) {
        if !post.success {
            self.post_request_error = post.error;
        }
        self.tests = Some(post.tests);
        self.environment = Some(post.environment);
    }

    fn into_outcome(self, result: ExecutionResult) -> ExecuteOutcome {
        ExecuteOutcome {
            result,
            pre_request_error: self.pre_request_error,
            post_request_error: self.post_request_error,
            tests: self.tests,
            environment: self.environment,
        }
    }
}
