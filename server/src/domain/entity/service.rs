//! Entity services
//!
//! The capability set the CRUD routes are generated from. `find_many` and
//! `find_one` are mandatory; create, update and delete are optional and
//! advertised through [`EntityService::capabilities`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use utoipa::ToSchema;

use super::descriptor::EntityDescriptor;
use super::schema::FieldViolation;
use crate::data::{DataError, Document, DocumentStore};
use crate::domain::query::{QueryError, QueryLimits, QueryResult, SearchQuery, compile, execute};
use crate::utils::time::now_millis;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("Validation failed for {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldViolation>),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{entity} does not support {operation}")]
    Unsupported {
        entity: String,
        operation: &'static str,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] DataError),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Optional operations a service supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct Capabilities {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Capabilities {
    pub const READ_ONLY: Capabilities = Capabilities {
        create: false,
        update: false,
        delete: false,
    };

    pub const FULL: Capabilities = Capabilities {
        create: true,
        update: true,
        delete: true,
    };
}

#[async_trait]
pub trait EntityService: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    async fn find_many(&self, query: &SearchQuery) -> Result<QueryResult<Document>, ServiceError>;

    async fn find_one(&self, id: &str) -> Result<Document, ServiceError>;

    async fn create(&self, _data: Map<String, Value>) -> Result<Document, ServiceError> {
        Err(ServiceError::Unsupported {
            entity: String::new(),
            operation: "create",
        })
    }

    async fn update(
        &self,
        _id: &str,
        _patch: Map<String, Value>,
    ) -> Result<Document, ServiceError> {
        Err(ServiceError::Unsupported {
            entity: String::new(),
            operation: "update",
        })
    }

    async fn delete(&self, _id: &str) -> Result<Document, ServiceError> {
        Err(ServiceError::Unsupported {
            entity: String::new(),
            operation: "delete",
        })
    }
}

/// Generic service storing one entity in the document store
pub struct DocumentService {
    descriptor: Arc<EntityDescriptor>,
    store: Arc<dyn DocumentStore>,
    limits: QueryLimits,
    capabilities: Capabilities,
}

impl DocumentService {
    pub fn new(
        descriptor: Arc<EntityDescriptor>,
        store: Arc<dyn DocumentStore>,
        limits: QueryLimits,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            descriptor,
            store,
            limits,
            capabilities,
        }
    }

    fn entity(&self) -> &str {
        self.descriptor.name()
    }

    fn ensure(&self, allowed: bool, operation: &'static str) -> Result<(), ServiceError> {
        if allowed {
            Ok(())
        } else {
            Err(ServiceError::Unsupported {
                entity: self.entity().to_string(),
                operation,
            })
        }
    }
}

#[async_trait]
impl EntityService for DocumentService {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn find_many(&self, query: &SearchQuery) -> Result<QueryResult<Document>, ServiceError> {
        let compiled = compile(query, &self.descriptor, &self.limits)?;
        tracing::trace!(
            entity = %self.entity(),
            predicate = %compiled.predicate.sql,
            binds = compiled.predicate.params.len(),
            "Compiled list query"
        );
        Ok(execute(&compiled, self.store.as_ref()).await?)
    }

    async fn find_one(&self, id: &str) -> Result<Document, ServiceError> {
        self.store
            .get_document(self.entity(), id)
            .await?
            .ok_or_else(|| ServiceError::not_found(self.entity(), id))
    }

    async fn create(&self, data: Map<String, Value>) -> Result<Document, ServiceError> {
        self.ensure(self.capabilities.create, "create")?;
        let doc = Document::new(uuid::Uuid::new_v4().to_string(), data, now_millis());
        self.store.insert_document(self.entity(), &doc).await?;
        tracing::debug!(entity = %self.entity(), id = %doc.id, "Created document");
        Ok(doc)
    }

    async fn update(&self, id: &str, patch: Map<String, Value>) -> Result<Document, ServiceError> {
        self.ensure(self.capabilities.update, "update")?;
        self.store
            .update_document(self.entity(), id, &patch, now_millis())
            .await?
            .ok_or_else(|| ServiceError::not_found(self.entity(), id))
    }

    async fn delete(&self, id: &str) -> Result<Document, ServiceError> {
        self.ensure(self.capabilities.delete, "delete")?;
        let doc = self
            .store
            .delete_document(self.entity(), id)
            .await?
            .ok_or_else(|| ServiceError::not_found(self.entity(), id))?;
        tracing::debug!(entity = %self.entity(), id = %id, "Deleted document");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SqliteService;
    use crate::domain::entity::FieldDescriptor;
    use serde_json::json;

    async fn service(capabilities: Capabilities) -> DocumentService {
        let descriptor = EntityDescriptor::builder("members")
            .field(FieldDescriptor::text("name").sortable())
            .build()
            .unwrap();
        let store: Arc<dyn DocumentStore> =
            Arc::new(Arc::new(SqliteService::init_in_memory().await.unwrap()));
        DocumentService::new(
            Arc::new(descriptor),
            store,
            QueryLimits::default(),
            capabilities,
        )
    }

    fn data(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_find_update_delete() {
        let svc = service(Capabilities::FULL).await;

        let created = svc.create(data(json!({"name": "Ada"}))).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);
        assert!(uuid::Uuid::parse_str(&created.id).is_ok());

        let found = svc.find_one(&created.id).await.unwrap();
        assert_eq!(found, created);

        let updated = svc
            .update(&created.id, data(json!({"name": "Ada L."})))
            .await
            .unwrap();
        assert_eq!(updated.get("name"), Some(&json!("Ada L.")));
        assert!(updated.updated_at >= created.updated_at);

        let deleted = svc.delete(&created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);

        let again = svc.delete(&created.id).await.unwrap_err();
        assert!(matches!(again, ServiceError::NotFound { .. }));
        let missing = svc.find_one(&created.id).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_many_pages_and_counts() {
        let svc = service(Capabilities::FULL).await;
        for name in ["a", "b", "c"] {
            svc.create(data(json!({ "name": name }))).await.unwrap();
        }
        let query = SearchQuery::new()
            .with_sort(crate::domain::query::SortSpec::asc("name"))
            .with_page(1, 2);
        let result = svc.find_many(&query).await.unwrap();
        assert_eq!(result.total_count, 3);
        let names: Vec<_> = result.items.iter().map(|d| d.get("name").cloned()).collect();
        assert_eq!(names, vec![Some(json!("a")), Some(json!("b"))]);
    }

    #[tokio::test]
    async fn test_read_only_service_rejects_writes() {
        let svc = service(Capabilities::READ_ONLY).await;
        let err = svc.create(data(json!({"name": "x"}))).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Unsupported {
                operation: "create",
                ..
            }
        ));
        assert!(svc.update("x", Map::new()).await.is_err());
        assert!(svc.delete("x").await.is_err());
    }

    #[tokio::test]
    async fn test_find_many_rejects_bad_query() {
        let svc = service(Capabilities::READ_ONLY).await;
        let query = SearchQuery::new().with_page(1, 10_000);
        let err = svc.find_many(&query).await.unwrap_err();
        assert!(matches!(err, ServiceError::Query(QueryError::InvalidPagination(_))));
    }
}
