//! Entity catalog endpoint
//!
//! Lists every registered entity with its fields, the operators each field
//! accepts and which write operations are exposed. A filter-builder UI renders
//! its controls from this.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::types::{ApiError, DataResponse};
use crate::domain::entity::{Capabilities, EntityRegistry, EntityResource, FieldDescriptor};
use crate::domain::query::{Operator, OperatorSpec, default_operator_for, operators_for};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    #[serde(flatten)]
    pub field: FieldDescriptor,
    /// Operators in display order; empty when the field is not filterable
    #[schema(value_type = Vec<Object>)]
    pub operators: Vec<OperatorSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_operator: Option<Operator>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntitySummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub capabilities: Capabilities,
    pub fields: Vec<FieldSummary>,
}

impl EntitySummary {
    pub fn from_resource(resource: &EntityResource) -> Self {
        let descriptor = &resource.descriptor;
        let fields = descriptor
            .fields()
            .iter()
            .map(|field| {
                let filterable = field.filterable;
                FieldSummary {
                    field: field.clone(),
                    operators: if filterable {
                        operators_for(field.variant).to_vec()
                    } else {
                        Vec::new()
                    },
                    default_operator: filterable.then(|| default_operator_for(field.variant)),
                }
            })
            .collect();
        Self {
            name: descriptor.name().to_string(),
            label: descriptor.label().map(str::to_string),
            capabilities: resource.exposed(),
            fields,
        }
    }
}

pub fn routes(registry: EntityRegistry) -> Router<()> {
    Router::new()
        .route("/", get(list_entities))
        .route("/{name}", get(get_entity))
        .with_state(registry)
}

/// List registered entities
#[utoipa::path(
    get,
    path = "/api/v1/entities",
    tag = "entities",
    responses(
        (status = 200, description = "Registered entities in registration order", body = Vec<EntitySummary>)
    )
)]
pub async fn list_entities(
    State(registry): State<EntityRegistry>,
) -> Json<DataResponse<Vec<EntitySummary>>> {
    let summaries = registry
        .iter()
        .map(|r| EntitySummary::from_resource(r))
        .collect();
    Json(DataResponse::new(summaries))
}

/// Describe one entity
#[utoipa::path(
    get,
    path = "/api/v1/entities/{name}",
    tag = "entities",
    params(("name" = String, Path, description = "Entity name")),
    responses(
        (status = 200, description = "Entity description", body = EntitySummary),
        (status = 404, description = "Unknown entity", body = crate::api::types::ErrorBody)
    )
)]
pub async fn get_entity(
    State(registry): State<EntityRegistry>,
    Path(name): Path<String>,
) -> Result<Json<DataResponse<EntitySummary>>, ApiError> {
    let resource = registry
        .get(&name)
        .ok_or_else(|| ApiError::not_found("NOT_FOUND", format!("Unknown entity '{}'", name)))?;
    Ok(Json(DataResponse::new(EntitySummary::from_resource(resource))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DocumentStore, SqliteService};
    use crate::domain::catalog;
    use crate::domain::query::QueryLimits;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app() -> Router {
        let store: Arc<dyn DocumentStore> =
            Arc::new(Arc::new(SqliteService::init_in_memory().await.unwrap()));
        let registry = catalog::build_registry(store, QueryLimits::default()).unwrap();
        Router::new().nest("/api/v1/entities", routes(registry))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_lists_entities_in_order() {
        let (status, body) = get_json(app().await, "/api/v1/entities").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["members", "content", "plans", "artifacts"]);
    }

    #[tokio::test]
    async fn test_describes_fields_and_operators() {
        let (status, body) = get_json(app().await, "/api/v1/entities/members").await;
        assert_eq!(status, StatusCode::OK);
        let entity = &body["data"];
        assert_eq!(entity["capabilities"]["create"], true);

        let fields = entity["fields"].as_array().unwrap();
        let field = |name: &str| fields.iter().find(|f| f["name"] == name).unwrap();

        let active = field("active");
        assert_eq!(active["variant"], "boolean");
        assert_eq!(active["defaultOperator"], "equals");
        assert!(
            active["operators"]
                .as_array()
                .unwrap()
                .iter()
                .all(|op| op["operator"] != "contains")
        );

        let role = field("role");
        assert_eq!(role["options"][0], "owner");

        let bio = field("bio");
        assert_eq!(bio["operators"].as_array().unwrap().len(), 0);
        assert!(bio.get("defaultOperator").is_none());
        assert!(bio.get("column").is_none());
    }

    #[tokio::test]
    async fn test_read_only_capabilities() {
        let (_, body) = get_json(app().await, "/api/v1/entities/plans").await;
        assert_eq!(body["data"]["capabilities"]["create"], false);
        assert_eq!(body["data"]["capabilities"]["delete"], false);
    }

    #[tokio::test]
    async fn test_unknown_entity() {
        let (status, body) = get_json(app().await, "/api/v1/entities/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
