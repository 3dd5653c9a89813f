//! Collection data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named grouping of saved requests, owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,

    /// Owning user id.
    pub owner_id: String,

    /// Serialized collection-level headers (JSON object), applied under request headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl Collection {
    /// Creates a collection with a generated id and no headers.
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            owner_id: owner_id.into(),
            headers: None,
            updated_at: Utc::now(),
        }
    }

    /// Sets the serialized collection headers.
    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = Some(headers.into());
        self
    }
}
