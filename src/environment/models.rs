//! Environment data model.
//!
//! An Environment is a named set of variables used for template substitution.
//! Variables are stored serialized (a JSON object) exactly as the storage
//! collaborator keeps them; parsing happens per execution into a local copy.

use crate::variables::{string_map_from_json, VariableMap};
use serde::{Deserialize, Serialize};

/// A stored environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Unique identifier
    pub id: String,

    /// Environment name (e.g., "Local Environment", "staging")
    pub name: String,

    /// Serialized variable mapping (JSON object of name to value)
    #[serde(default = "empty_object")]
    pub variables: String,
}

fn empty_object() -> String {
    "{}".to_string()
}

impl Environment {
    /// Creates a new environment with a generated id and no variables
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            variables: empty_object(),
        }
    }

    /// Creates a new environment with name and variables
    pub fn with_variables(name: impl Into<String>, variables: &VariableMap) -> Self {
        let mut env = Self::new(name);
        env.set_variables(variables);
        env
    }

    /// Parses the stored variables.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the stored value is not a JSON object.
    pub fn parse_variables(&self) -> Result<VariableMap, serde_json::Error> {
        string_map_from_json(&self.variables)
    }

    /// Replaces the stored variables with the serialized form of `variables`
    pub fn set_variables(&mut self, variables: &VariableMap) {
        // A string-to-string map always serializes
        self.variables = serde_json::to_string(variables).unwrap_or_else(|_| empty_object());
    }
}

/// Parses a serialized variables object, yielding an empty map on any failure.
pub fn parse_environment_variables(serialized: &str) -> VariableMap {
    string_map_from_json(serialized).unwrap_or_default()
}
