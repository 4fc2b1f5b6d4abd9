//! Stored entity instances

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::time::canonical;

/// One stored entity instance
///
/// Serialized as a single flat JSON object: the system fields `id`,
/// `createdAt` and `updatedAt` followed by the user fields in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(with = "canonical")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "canonical")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Document {
    /// New document stamped with the same creation and update time
    pub fn new(id: impl Into<String>, data: Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            data,
        }
    }

    /// Look up a user field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}
