//! Repository traits for database backends
//!
//! Services talk to storage through these traits so that the entity layer
//! never depends on a concrete backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::data::error::DataError;
use crate::data::types::{CompiledQuery, Document};

// ============================================================================
// Document Store Trait
// ============================================================================

/// Persistence for entity instances, keyed by `(entity, id)`
///
/// Implemented by the SQLite backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document (duplicate ids are a `Conflict`)
    async fn insert_document(&self, entity: &str, doc: &Document) -> Result<(), DataError>;

    /// Get a single document by id
    async fn get_document(&self, entity: &str, id: &str) -> Result<Option<Document>, DataError>;

    /// Merge-patch the user fields of a document
    async fn update_document(
        &self,
        entity: &str,
        id: &str,
        patch: &Map<String, Value>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Document>, DataError>;

    /// Delete a document, returning it if it existed
    async fn delete_document(&self, entity: &str, id: &str)
    -> Result<Option<Document>, DataError>;

    /// Fetch one page of a compiled query
    async fn find_documents(&self, query: &CompiledQuery) -> Result<Vec<Document>, DataError>;

    /// Count all matches of a compiled query, ignoring pagination
    async fn count_documents(&self, query: &CompiledQuery) -> Result<u64, DataError>;

    /// Count all documents of one entity
    async fn count_entity(&self, entity: &str) -> Result<u64, DataError>;
}
