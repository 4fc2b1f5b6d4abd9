//! DocumentStore trait implementation for SQLite
//!
//! Implements the DocumentStore trait for Arc<SqliteService>, delegating to
//! the free functions in `repositories`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::data::error::DataError;
use crate::data::traits::DocumentStore;
use crate::data::types::{CompiledQuery, Document};

use super::SqliteService;
use super::repositories::document;

#[async_trait]
impl DocumentStore for Arc<SqliteService> {
    async fn insert_document(&self, entity: &str, doc: &Document) -> Result<(), DataError> {
        document::insert_document(self.pool(), entity, doc)
            .await
            .map_err(Into::into)
    }

    async fn get_document(&self, entity: &str, id: &str) -> Result<Option<Document>, DataError> {
        document::get_document(self.pool(), entity, id)
            .await
            .map_err(Into::into)
    }

    async fn update_document(
        &self,
        entity: &str,
        id: &str,
        patch: &Map<String, Value>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Document>, DataError> {
        document::update_document(self.pool(), entity, id, patch, updated_at)
            .await
            .map_err(Into::into)
    }

    async fn delete_document(
        &self,
        entity: &str,
        id: &str,
    ) -> Result<Option<Document>, DataError> {
        document::delete_document(self.pool(), entity, id)
            .await
            .map_err(Into::into)
    }

    async fn find_documents(&self, query: &CompiledQuery) -> Result<Vec<Document>, DataError> {
        document::find_documents(self.pool(), query)
            .await
            .map_err(Into::into)
    }

    async fn count_documents(&self, query: &CompiledQuery) -> Result<u64, DataError> {
        document::count_documents(self.pool(), query)
            .await
            .map_err(Into::into)
    }

    async fn count_entity(&self, entity: &str) -> Result<u64, DataError> {
        document::count_entity(self.pool(), entity)
            .await
            .map_err(Into::into)
    }
}
