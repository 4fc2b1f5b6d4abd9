//! OpenAPI specification and Swagger UI
//!
//! Fixed endpoints are described with `#[utoipa::path]`; the per-entity CRUD
//! paths are generated from each registered descriptor when the server starts.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, Json};
use utoipa::OpenApi;
use utoipa::openapi::path::{HttpMethod, Operation, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{
    ArrayBuilder, KnownFormat, ObjectBuilder, Schema, SchemaFormat, Type,
};
use utoipa::openapi::{ContentBuilder, Ref, RefOr, Required, ResponseBuilder};

use crate::api::routes::{entities, health};
use crate::api::types::{ErrorBody, ListMeta};
use crate::domain::entity::{
    Capabilities, EntityDescriptor, EntityRegistry, EntityResource, FieldDescriptor, FieldVariant,
    FieldViolation,
};
use crate::domain::query::Operator;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QueryForge API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Generic entity query and CRUD service"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "entities", description = "Registered entity descriptors")
    ),
    paths(
        health::health,
        entities::list_entities,
        entities::get_entity,
    ),
    components(schemas(
        health::HealthResponse,
        entities::EntitySummary,
        entities::FieldSummary,
        FieldDescriptor,
        FieldVariant,
        Operator,
        Capabilities,
        ListMeta,
        ErrorBody,
        FieldViolation,
    ))
)]
pub struct ApiDoc;

fn json_content(schema: RefOr<Schema>) -> utoipa::openapi::Content {
    ContentBuilder::new().schema(Some(schema)).build()
}

fn error_response(description: &str) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            "application/json",
            json_content(RefOr::Ref(Ref::from_schema_name("ErrorBody"))),
        )
        .build()
}

fn string_schema() -> ObjectBuilder {
    ObjectBuilder::new().schema_type(Type::String)
}

fn date_time_schema() -> ObjectBuilder {
    string_schema().format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime)))
}

fn field_schema(field: &FieldDescriptor) -> RefOr<Schema> {
    let object = match field.variant {
        FieldVariant::Text => string_schema().max_length(field.max_length),
        FieldVariant::Number | FieldVariant::Range => {
            ObjectBuilder::new().schema_type(Type::Number)
        }
        FieldVariant::Boolean => ObjectBuilder::new().schema_type(Type::Boolean),
        FieldVariant::Date => date_time_schema(),
        FieldVariant::Select => string_schema().enum_values(Some(field.options.clone())),
        FieldVariant::MultiSelect => {
            let item = string_schema().enum_values(Some(field.options.clone()));
            return RefOr::T(Schema::Array(ArrayBuilder::new().items(item).build()));
        }
        FieldVariant::DateRange => ObjectBuilder::new()
            .schema_type(Type::Object)
            .property("start", date_time_schema())
            .property("end", date_time_schema()),
    };
    let object = match &field.label {
        Some(label) => object.title(Some(label.clone())),
        None => object,
    };
    RefOr::T(Schema::Object(object.build()))
}

/// Schema of a stored entity (`readonly` fields and system fields included)
fn document_schema(descriptor: &EntityDescriptor) -> Schema {
    let mut object = ObjectBuilder::new().schema_type(Type::Object);
    for field in descriptor.fields() {
        object = object.property(field.name.clone(), field_schema(field));
        if field.is_system() || field.required {
            object = object.required(field.name.clone());
        }
    }
    Schema::Object(object.build())
}

/// Schema of a request body; `required` lists only apply on create
fn body_schema(descriptor: &EntityDescriptor, create: bool) -> Schema {
    let mut object = ObjectBuilder::new().schema_type(Type::Object);
    for field in descriptor.writable_fields() {
        object = object.property(field.name.clone(), field_schema(field));
        if create && field.required {
            object = object.required(field.name.clone());
        }
    }
    Schema::Object(object.build())
}

fn query_param(
    name: &str,
    schema: ObjectBuilder,
    description: &str,
) -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some(description))
        .schema(Some(schema))
        .build()
}

fn id_param() -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(string_schema()))
        .build()
}

fn list_parameters() -> Vec<utoipa::openapi::path::Parameter> {
    let integer = || ObjectBuilder::new().schema_type(Type::Integer);
    vec![
        query_param("filters", string_schema(), "JSON array of conditions, ANDed"),
        query_param("filter", string_schema(), "JSON filter tree"),
        query_param("sortBy", string_schema(), "Sort field"),
        query_param(
            "sortDirection",
            string_schema().enum_values(Some(["asc", "desc"])),
            "Sort direction (default desc)",
        ),
        query_param("sort", string_schema(), "Sort keys as field:dir, comma separated"),
        query_param("limit", integer(), "Page size"),
        query_param(
            "offset",
            integer(),
            "Rows to skip. Must be a multiple of limit (offset=5&limit=10 is rejected) and \
             cannot be combined with page; violations return 400 INVALID_PAGINATION",
        ),
        query_param(
            "page",
            integer(),
            "1-based page number; cannot be combined with offset",
        ),
        query_param("startDate", date_time_schema(), "Earliest createdAt"),
        query_param("endDate", date_time_schema(), "Latest createdAt"),
    ]
}

fn single_response(description: &str, schema_name: &str) -> utoipa::openapi::Response {
    let envelope = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("data", Ref::from_schema_name(schema_name))
        .required("data")
        .build();
    ResponseBuilder::new()
        .description(description)
        .content("application/json", json_content(RefOr::T(Schema::Object(envelope))))
        .build()
}

fn operation(tag: &str, id: String, summary: String) -> OperationBuilder {
    OperationBuilder::new()
        .tag(tag)
        .operation_id(Some(id))
        .summary(Some(summary))
}

/// Add the paths and component schemas for one resource
fn add_resource(doc: &mut utoipa::openapi::OpenApi, resource: &EntityResource) {
    let descriptor = &resource.descriptor;
    let name = descriptor.name();
    let exposed = resource.exposed();
    let schema_name = format!("{}Document", name);
    let collection_path = format!("/api/v1/{}", name);
    let item_path = format!("/api/v1/{}/{{id}}", name);

    let components = doc.components.get_or_insert_with(Default::default);
    components
        .schemas
        .insert(schema_name.clone(), RefOr::T(document_schema(descriptor)));

    let list_envelope = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property(
            "data",
            ArrayBuilder::new().items(Ref::from_schema_name(&schema_name)),
        )
        .property("meta", Ref::from_schema_name("ListMeta"))
        .required("data")
        .required("meta")
        .build();

    let mut list = operation(name, format!("list_{}", name), format!("List {}", name))
        .response(
            "200",
            ResponseBuilder::new()
                .description("One page of results")
                .content(
                    "application/json",
                    json_content(RefOr::T(Schema::Object(list_envelope))),
                )
                .build(),
        )
        .response("400", error_response("Invalid filter, sort or pagination"));
    for param in list_parameters() {
        list = list.parameter(param);
    }
    add(doc, &collection_path, HttpMethod::Get, list.build());

    let read = operation(name, format!("get_{}", name), format!("Get one of {}", name))
        .parameter(id_param())
        .response("200", single_response("Found", &schema_name))
        .response("404", error_response("No such id"))
        .build();
    add(doc, &item_path, HttpMethod::Get, read);

    if exposed.create {
        let create = operation(name, format!("create_{}", name), format!("Create in {}", name))
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content(
                        "application/json",
                        json_content(RefOr::T(body_schema(descriptor, true))),
                    )
                    .required(Some(Required::True))
                    .build(),
            ))
            .response("201", single_response("Created", &schema_name))
            .response("400", error_response("Body failed validation"))
            .build();
        add(doc, &collection_path, HttpMethod::Post, create);
    }

    if exposed.update {
        let update = operation(name, format!("update_{}", name), format!("Update in {}", name))
            .parameter(id_param())
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content(
                        "application/json",
                        json_content(RefOr::T(body_schema(descriptor, false))),
                    )
                    .required(Some(Required::True))
                    .build(),
            ))
            .response("200", single_response("Updated", &schema_name))
            .response("400", error_response("Body failed validation"))
            .response("404", error_response("No such id"))
            .build();
        add(doc, &item_path, HttpMethod::Patch, update);
    }

    if exposed.delete {
        let delete = operation(name, format!("delete_{}", name), format!("Delete from {}", name))
            .parameter(id_param())
            .response("200", single_response("The deleted entity", &schema_name))
            .response("404", error_response("No such id"))
            .build();
        add(doc, &item_path, HttpMethod::Delete, delete);
    }
}

fn add(doc: &mut utoipa::openapi::OpenApi, path: &str, method: HttpMethod, op: Operation) {
    doc.paths.add_path_operation(path, vec![method], op);
}

/// Full document: fixed endpoints plus every registered entity
pub fn build(registry: &EntityRegistry) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    for resource in registry.iter() {
        add_resource(&mut doc, resource);
    }
    doc
}

/// Serve OpenAPI JSON specification
pub async fn openapi_json(
    State(doc): State<Arc<utoipa::openapi::OpenApi>>,
) -> Json<utoipa::openapi::OpenApi> {
    Json(doc.as_ref().clone())
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>QueryForge API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true
            });
        };
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DocumentStore, SqliteService};
    use crate::domain::catalog;
    use crate::domain::query::QueryLimits;

    async fn doc() -> serde_json::Value {
        let store: Arc<dyn DocumentStore> =
            Arc::new(Arc::new(SqliteService::init_in_memory().await.unwrap()));
        let registry = catalog::build_registry(store, QueryLimits::default()).unwrap();
        serde_json::to_value(build(&registry)).unwrap()
    }

    #[tokio::test]
    async fn test_paths_follow_capabilities() {
        let doc = doc().await;
        let paths = &doc["paths"];

        let members = &paths["/api/v1/members"];
        assert!(members.get("get").is_some());
        assert!(members.get("post").is_some());
        let member = &paths["/api/v1/members/{id}"];
        assert!(member.get("patch").is_some());
        assert!(member.get("delete").is_some());

        assert!(paths["/api/v1/plans"].get("post").is_none());
        assert!(paths["/api/v1/plans/{id}"].get("delete").is_none());

        let artifact = &paths["/api/v1/artifacts/{id}"];
        assert!(artifact.get("delete").is_some());
        assert!(artifact.get("patch").is_none());

        assert!(paths["/api/v1/health"].get("get").is_some());
    }

    #[tokio::test]
    async fn test_document_schemas_describe_fields() {
        let doc = doc().await;
        let members = &doc["components"]["schemas"]["membersDocument"];
        assert_eq!(members["properties"]["role"]["enum"][1], "admin");
        assert_eq!(members["properties"]["name"]["maxLength"], 120);
        let required = members["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "id"));
        assert!(required.iter().any(|r| r == "email"));

        let tags = &doc["components"]["schemas"]["contentDocument"]["properties"]["tags"];
        assert_eq!(tags["type"], "array");
    }

    #[tokio::test]
    async fn test_offset_rules_are_documented() {
        let doc = doc().await;
        let params = doc["paths"]["/api/v1/members"]["get"]["parameters"]
            .as_array()
            .unwrap();
        let offset = params.iter().find(|p| p["name"] == "offset").unwrap();
        let description = offset["description"].as_str().unwrap();
        assert!(description.contains("multiple of limit"));
        assert!(description.contains("INVALID_PAGINATION"));
        let page = params.iter().find(|p| p["name"] == "page").unwrap();
        assert!(page["description"].as_str().unwrap().contains("offset"));
    }
}
