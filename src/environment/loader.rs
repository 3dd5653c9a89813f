//! Effective variable loading for one execution.
//!
//! Precedence: caller-supplied variables win outright; otherwise the Environment
//! named by id is loaded; without an id the configured default Environment (looked
//! up by name) is used. Any lookup or parse failure yields an empty mapping.

use super::models::Environment;
use crate::storage::Storage;
use crate::variables::VariableMap;
use log::{debug, warn};

/// Where the effective variables came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSource {
    /// Supplied by the caller with the execution.
    Caller,
    /// Loaded from the stored Environment with this id.
    Environment(String),
    /// Nothing found; the mapping is empty.
    Empty,
}

/// The per-execution variable copy and its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedVariables {
    pub variables: VariableMap,
    pub source: VariableSource,
}

impl LoadedVariables {
    fn empty() -> Self {
        Self {
            variables: VariableMap::new(),
            source: VariableSource::Empty,
        }
    }

    /// Id of the stored Environment backing these variables, if any.
    pub fn environment_id(&self) -> Option<&str> {
        match &self.source {
            VariableSource::Environment(id) => Some(id.as_str()),
            VariableSource::Caller | VariableSource::Empty => None,
        }
    }
}

/// Resolves the effective variable mapping. Never fails.
///
/// # Arguments
///
/// * `storage` - Storage collaborator
/// * `explicit` - Caller-supplied variables
/// * `environment_id` - Environment to load when no explicit variables are given
/// * `default_environment_name` - Environment used when no id is given
pub async fn load_variables(
    storage: &dyn Storage,
    explicit: Option<&VariableMap>,
    environment_id: Option<&str>,
    default_environment_name: &str,
) -> LoadedVariables {
    if let Some(variables) = explicit {
        return LoadedVariables {
            variables: variables.clone(),
            source: VariableSource::Caller,
        };
    }

    let lookup = match environment_id {
        Some(id) => storage.get_environment(id).await,
        None => storage.find_environment_by_name(default_environment_name).await,
    };

    match lookup {
        Ok(Some(env)) => from_environment(&env),
        Ok(None) => {
            debug!(
                "No environment found (id: {:?}, default: {}), using empty variables",
                environment_id, default_environment_name
            );
            LoadedVariables::empty()
        }
        Err(e) => {
            warn!("Failed to load environment: {}", e);
            LoadedVariables::empty()
        }
    }
}

fn from_environment(env: &Environment) -> LoadedVariables {
    match env.parse_variables() {
        Ok(variables) => LoadedVariables {
            variables,
            source: VariableSource::Environment(env.id.clone()),
        },
        Err(e) => {
            warn!("Environment {} has malformed variables: {}", env.name, e);
            LoadedVariables::empty()
        }
    }
}
