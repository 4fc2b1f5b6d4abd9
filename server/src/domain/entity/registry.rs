//! Registered resources
//!
//! An [`EntityResource`] bundles everything the route generator needs for one
//! entity. The [`EntityRegistry`] keeps them in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use super::descriptor::{EntityDescriptor, SchemaError};
use super::schema::BodySchema;
use super::service::{Capabilities, EntityService};

/// Route segments under `/api/v1` that entities may not shadow
const RESERVED_NAMES: [&str; 2] = ["entities", "health"];

/// One entity with its service and optional body schemas
pub struct EntityResource {
    pub descriptor: Arc<EntityDescriptor>,
    pub service: Arc<dyn EntityService>,
    pub create_schema: Option<BodySchema>,
    pub update_schema: Option<BodySchema>,
}

impl EntityResource {
    pub fn new(descriptor: Arc<EntityDescriptor>, service: Arc<dyn EntityService>) -> Self {
        Self {
            descriptor,
            service,
            create_schema: None,
            update_schema: None,
        }
    }

    /// Attach the schemas matching the service's capabilities
    pub fn with_default_schemas(mut self) -> Self {
        let caps = self.service.capabilities();
        if caps.create {
            self.create_schema = Some(BodySchema::for_create(&self.descriptor));
        }
        if caps.update {
            self.update_schema = Some(BodySchema::for_update(&self.descriptor));
        }
        self
    }

    pub fn with_create_schema(mut self, schema: BodySchema) -> Self {
        self.create_schema = Some(schema);
        self
    }

    pub fn with_update_schema(mut self, schema: BodySchema) -> Self {
        self.update_schema = Some(schema);
        self
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Operations actually exposed over HTTP
    ///
    /// Create and update need both the capability and a schema.
    pub fn exposed(&self) -> Capabilities {
        let caps = self.service.capabilities();
        Capabilities {
            create: caps.create && self.create_schema.is_some(),
            update: caps.update && self.update_schema.is_some(),
            delete: caps.delete,
        }
    }
}

#[derive(Default, Clone)]
pub struct EntityRegistry {
    resources: Vec<Arc<EntityResource>>,
    index: HashMap<String, usize>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: EntityResource) -> Result<(), SchemaError> {
        let name = resource.name().to_string();
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(SchemaError::ReservedEntity(name));
        }
        if self.index.contains_key(&name) {
            return Err(SchemaError::DuplicateEntity(name));
        }
        tracing::debug!(entity = %name, exposed = ?resource.exposed(), "Registered entity");
        self.index.insert(name, self.resources.len());
        self.resources.push(Arc::new(resource));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EntityResource>> {
        self.index.get(name).map(|&i| &self.resources[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityResource>> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
