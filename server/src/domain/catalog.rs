//! Built-in resources
//!
//! | Entity      | Create | Update | Delete |
//! |-------------|--------|--------|--------|
//! | `members`   | yes    | yes    | yes    |
//! | `content`   | yes    | yes    | yes    |
//! | `plans`     | -      | -      | -      |
//! | `artifacts` | yes    | -      | yes    |
//!
//! Plans are read-only and seeded on first start.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::data::{DataError, Document, DocumentStore};
use crate::domain::entity::{
    Capabilities, DocumentService, EntityDescriptor, EntityRegistry, EntityResource,
    FieldDescriptor, SchemaError,
};
use crate::domain::query::QueryLimits;
use crate::utils::time::now_millis;

pub fn members() -> Result<EntityDescriptor, SchemaError> {
    EntityDescriptor::builder("members")
        .label("Members")
        .field(
            FieldDescriptor::text("name")
                .sortable()
                .required()
                .max_length(120),
        )
        .field(
            FieldDescriptor::text("email")
                .sortable()
                .required()
                .max_length(254),
        )
        .field(FieldDescriptor::select("role", ["owner", "admin", "member"]).sortable().required())
        .field(FieldDescriptor::boolean("active").label("Active"))
        .field(FieldDescriptor::date("joinedAt").sortable().label("Joined"))
        .field(FieldDescriptor::text("bio").not_filterable().max_length(2000))
        .build()
}

pub fn content() -> Result<EntityDescriptor, SchemaError> {
    EntityDescriptor::builder("content")
        .label("Content")
        .field(FieldDescriptor::text("title").sortable().required().max_length(200))
        .field(
            FieldDescriptor::select("status", ["draft", "published", "archived"])
                .sortable()
                .required(),
        )
        .field(FieldDescriptor::multi_select(
            "tags",
            ["announcement", "guide", "release", "internal"],
        ))
        .field(FieldDescriptor::number("wordCount").sortable())
        .field(FieldDescriptor::range("rating"))
        .field(FieldDescriptor::date("publishedAt").sortable())
        .build()
}

pub fn plans() -> Result<EntityDescriptor, SchemaError> {
    EntityDescriptor::builder("plans")
        .label("Plans")
        .field(FieldDescriptor::text("name").sortable())
        .field(FieldDescriptor::select("tier", ["free", "pro", "enterprise"]).sortable())
        .field(FieldDescriptor::number("priceCents").sortable().label("Price"))
        .field(FieldDescriptor::range("seats"))
        .field(FieldDescriptor::multi_select(
            "features",
            ["api", "sso", "audit-log", "priority-support"],
        ))
        .build()
}

pub fn artifacts() -> Result<EntityDescriptor, SchemaError> {
    EntityDescriptor::builder("artifacts")
        .label("Artifacts")
        .field(FieldDescriptor::text("name").sortable().required())
        .field(
            FieldDescriptor::select("kind", ["report", "dataset", "model"])
                .sortable()
                .required(),
        )
        .field(FieldDescriptor::number("sizeBytes").sortable())
        .field(FieldDescriptor::date_range("retention").sortable())
        .field(FieldDescriptor::boolean("archived"))
        .build()
}

/// Build the registry of built-in resources on top of one store
pub fn build_registry(
    store: Arc<dyn DocumentStore>,
    limits: QueryLimits,
) -> Result<EntityRegistry, SchemaError> {
    let entries = [
        (members()?, Capabilities::FULL),
        (content()?, Capabilities::FULL),
        (plans()?, Capabilities::READ_ONLY),
        (
            artifacts()?,
            Capabilities {
                create: true,
                update: false,
                delete: true,
            },
        ),
    ];

    let mut registry = EntityRegistry::new();
    for (descriptor, capabilities) in entries {
        let descriptor = Arc::new(descriptor);
        let service =
            DocumentService::new(descriptor.clone(), store.clone(), limits, capabilities);
        registry.register(
            EntityResource::new(descriptor, Arc::new(service)).with_default_schemas(),
        )?;
    }
    Ok(registry)
}

fn seed_plans() -> Vec<(&'static str, Value)> {
    vec![
        (
            "plan-free",
            json!({"name": "Free", "tier": "free", "priceCents": 0, "seats": 1, "features": []}),
        ),
        (
            "plan-pro",
            json!({
                "name": "Pro", "tier": "pro", "priceCents": 2900, "seats": 10,
                "features": ["api", "priority-support"]
            }),
        ),
        (
            "plan-enterprise",
            json!({
                "name": "Enterprise", "tier": "enterprise", "priceCents": 49900, "seats": 500,
                "features": ["api", "sso", "audit-log", "priority-support"]
            }),
        ),
    ]
}

/// Insert the read-only plans if none exist yet; returns how many were written
pub async fn seed(store: &dyn DocumentStore) -> Result<usize, DataError> {
    if store.count_entity("plans").await? > 0 {
        tracing::debug!("Plans already seeded");
        return Ok(0);
    }

    let now = now_millis();
    let mut written = 0;
    for (id, data) in seed_plans() {
        let Value::Object(data) = data else { continue };
        store.insert_document("plans", &Document::new(id, data, now)).await?;
        written += 1;
    }
    tracing::debug!(count = written, "Seeded plans");
    Ok(written)
}
