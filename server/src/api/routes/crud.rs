//! Generated CRUD routes
//!
//! | Method   | Path    | Mounted when                     | Success |
//! |----------|---------|----------------------------------|---------|
//! | `GET`    | `/`     | always                           | 200     |
//! | `GET`    | `/{id}` | always                           | 200     |
//! | `POST`   | `/`     | create capability + create schema | 201     |
//! | `PATCH`  | `/{id}` | update capability + update schema | 200     |
//! | `DELETE` | `/{id}` | delete capability                 | 200     |
//!
//! Operations that are not mounted fall through to the transport layer's
//! 405 (path exists) or 404.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{MethodRouter, get};
use axum::{Json, Router};

use crate::api::extractors::{EntityIdPath, JsonObject, ValidatedQuery};
use crate::api::types::{ApiError, DataResponse, ListResponse};
use crate::data::Document;
use crate::domain::entity::{BodySchema, EntityResource, ServiceError};
use crate::domain::query::{ListQuery, QueryLimits};

#[derive(Clone)]
pub struct CrudState {
    pub resource: Arc<EntityResource>,
    pub limits: QueryLimits,
}

/// Build the routes for one entity, to be nested at `/api/v1/{entity}`
pub fn routes(resource: Arc<EntityResource>, limits: QueryLimits) -> Router<()> {
    let exposed = resource.exposed();

    let mut collection: MethodRouter<CrudState> = get(list_entities);
    if exposed.create {
        collection = collection.post(create_entity);
    }
    let mut item: MethodRouter<CrudState> = get(get_entity);
    if exposed.update {
        item = item.patch(update_entity);
    }
    if exposed.delete {
        item = item.delete(delete_entity);
    }

    Router::new()
        .route("/", collection)
        .route("/{id}", item)
        .with_state(CrudState { resource, limits })
}

fn check_body(
    schema: Option<&BodySchema>,
    body: &serde_json::Value,
) -> Result<serde_json::Map<String, serde_json::Value>, ApiError> {
    let schema = schema.ok_or_else(|| ApiError::MethodNotAllowed {
        message: "Operation is not available".to_string(),
    })?;
    schema
        .validate(body)
        .map_err(|violations| ServiceError::ValidationFailed(violations).into())
}

async fn list_entities(
    State(state): State<CrudState>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> Result<Json<ListResponse<Document>>, ApiError> {
    let search = query.into_search_query(&state.resource.descriptor, &state.limits)?;
    let result = state.resource.service.find_many(&search).await?;
    Ok(Json(ListResponse::new(
        result,
        search.page.number,
        search.page.size,
    )))
}

async fn get_entity(
    State(state): State<CrudState>,
    path: EntityIdPath,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let doc = state.resource.service.find_one(&path.id).await?;
    Ok(Json(DataResponse::new(doc)))
}

async fn create_entity(
    State(state): State<CrudState>,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<DataResponse<Document>>), ApiError> {
    let data = check_body(state.resource.create_schema.as_ref(), &body)?;
    let doc = state.resource.service.create(data).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(doc))))
}

async fn update_entity(
    State(state): State<CrudState>,
    path: EntityIdPath,
    JsonObject(body): JsonObject,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let patch = check_body(state.resource.update_schema.as_ref(), &body)?;
    let doc = state.resource.service.update(&path.id, patch).await?;
    Ok(Json(DataResponse::new(doc)))
}

async fn delete_entity(
    State(state): State<CrudState>,
    path: EntityIdPath,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let doc = state.resource.service.delete(&path.id).await?;
    Ok(Json(DataResponse::new(doc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DocumentStore, SqliteService};
    use crate::domain::entity::{
        Capabilities, DocumentService, EntityDescriptor, FieldDescriptor,
    };
    use crate::utils::time::parse_timestamp;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use chrono::Duration;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn store() -> Arc<dyn DocumentStore> {
        Arc::new(Arc::new(SqliteService::init_in_memory().await.unwrap()))
    }

    fn accounts() -> Arc<EntityDescriptor> {
        Arc::new(
            EntityDescriptor::builder("accounts")
                .field(FieldDescriptor::text("name").sortable().required())
                .field(FieldDescriptor::select("status", ["active", "inactive"]).sortable())
                .field(FieldDescriptor::number("score").sortable())
                .build()
                .unwrap(),
        )
    }

    fn app(store: Arc<dyn DocumentStore>, caps: Capabilities) -> Router {
        let descriptor = accounts();
        let limits = QueryLimits::default();
        let service = DocumentService::new(descriptor.clone(), store, limits, caps);
        let resource = EntityResource::new(descriptor, Arc::new(service)).with_default_schemas();
        Router::new().nest("/api/v1/accounts", routes(Arc::new(resource), limits))
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// 25 accounts created a minute apart; the even ones up to acc-18 are active
    async fn seed_accounts(store: &dyn DocumentStore) -> Vec<String> {
        let base = parse_timestamp("2024-03-01T09:00:00Z").unwrap();
        let mut active = Vec::new();
        for i in 0..25 {
            let status = if i % 2 == 0 && active.len() < 10 {
                "active"
            } else {
                "inactive"
            };
            let id = format!("acc-{:02}", i);
            if status == "active" {
                active.push(id.clone());
            }
            let data = json!({"name": format!("Account {}", i), "status": status, "score": i % 3});
            let doc = Document::new(
                id,
                data.as_object().cloned().unwrap(),
                base + Duration::minutes(i),
            );
            store.insert_document("accounts", &doc).await.unwrap();
        }
        active
    }

    fn ids(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_filtered_list_returns_newest_first() {
        let store = store().await;
        let mut active = seed_accounts(store.as_ref()).await;
        let app = app(store, Capabilities::FULL);

        let filter = json!({
            "type": "condition", "field": "status", "operator": "equals", "value": "active"
        });
        let uri = format!(
            "/api/v1/accounts?filter={}&sortBy=createdAt&sortDirection=desc&limit=10&page=1",
            urlencode(&filter.to_string())
        );
        let (status, body) = call(&app, Method::GET, &uri, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 10);
        assert_eq!(body["meta"]["totalPages"], 1);
        active.reverse();
        assert_eq!(ids(&body), active);
    }

    #[tokio::test]
    async fn test_pages_cover_every_row_once() {
        let store = store().await;
        seed_accounts(store.as_ref()).await;
        let app = app(store, Capabilities::FULL);

        // score takes only three values, so most rows tie on the sort key
        let mut seen = Vec::new();
        for page in 1..=4 {
            let uri = format!(
                "/api/v1/accounts?sortBy=score&sortDirection=asc&limit=7&page={}",
                page
            );
            let (status, body) = call(&app, Method::GET, &uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["meta"]["total"], 25);
            seen.extend(ids(&body));
        }
        assert_eq!(seen.len(), 25);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 25);
    }

    #[tokio::test]
    async fn test_list_rejects_invalid_queries() {
        let app = app(store().await, Capabilities::FULL);
        let bad_op = urlencode(r#"[{"field":"status","operator":"contains","value":"a"}]"#);
        let cases = [
            (format!("/api/v1/accounts?filters={}", bad_op), "INVALID_OPERATOR"),
            ("/api/v1/accounts?sortBy=nope".to_string(), "INVALID_FIELD"),
            ("/api/v1/accounts?limit=0".to_string(), "INVALID_PAGINATION"),
            ("/api/v1/accounts?limit=10&offset=5".to_string(), "INVALID_PAGINATION"),
            ("/api/v1/accounts?filter=%7Bnot-json".to_string(), "MALFORMED_QUERY"),
            ("/api/v1/accounts?limit=abc".to_string(), "QUERY_PARSE_ERROR"),
        ];
        for (uri, code) in cases {
            let (status, body) = call(&app, Method::GET, &uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["code"], code, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_create_read_update_delete() {
        let app = app(store().await, Capabilities::FULL);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts",
            Some(json!({"name": "Ada", "status": "active"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let item = format!("/api/v1/accounts/{}", id);

        let (status, body) = call(&app, Method::GET, &item, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Ada");

        let (status, body) =
            call(&app, Method::PATCH, &item, Some(json!({"score": 7}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["score"], 7);
        assert_eq!(body["data"]["name"], "Ada");

        let (status, body) = call(&app, Method::DELETE, &item, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id.as_str());

        let (status, body) = call(&app, Method::DELETE, &item, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = call(&app, Method::GET, &item, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_validation_failures() {
        let app = app(store().await, Capabilities::FULL);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts",
            Some(json!({"status": "gone", "extra": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"status"));
        assert!(fields.contains(&"extra"));

        let (status, _) = call(
            &app,
            Method::PATCH,
            "/api/v1/accounts/missing",
            Some(json!({"score": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_object_bodies_fail_validation() {
        let app = app(store().await, Capabilities::FULL);
        let (_, created) = call(
            &app,
            Method::POST,
            "/api/v1/accounts",
            Some(json!({"name": "acme"})),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap();
        let item = format!("/api/v1/accounts/{}", id);
        let targets = [
            (Method::POST, "/api/v1/accounts"),
            (Method::PATCH, item.as_str()),
        ];

        for body in [json!([1, 2]), json!("x"), Value::Null, json!(3)] {
            for (method, uri) in &targets {
                let (status, response) =
                    call(&app, method.clone(), uri, Some(body.clone())).await;
                assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, body);
                assert_eq!(response["code"], "VALIDATION_FAILED", "{} {}", method, body);
                assert_eq!(response["details"][0]["field"], "");
                assert_eq!(response["details"][0]["code"], "type");
            }
        }

        let (status, body) = call(&app, Method::POST, "/api/v1/accounts", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_ne!(body["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_read_only_entity_has_no_write_routes() {
        let store = store().await;
        seed_accounts(store.as_ref()).await;
        let app = app(store, Capabilities::READ_ONLY);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/accounts",
            Some(json!({"name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&app, Method::DELETE, "/api/v1/accounts/acc-01", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&app, Method::GET, "/api/v1/accounts/acc-01", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    fn urlencode(s: &str) -> String {
        let mut url = reqwest::Url::parse("http://x/").unwrap();
        url.query_pairs_mut().append_pair("v", s);
        url.query().unwrap().trim_start_matches("v=").to_string()
    }
}
