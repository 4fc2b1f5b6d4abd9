//! Entity descriptors and the services behind generated routes

pub mod descriptor;
pub mod registry;
pub mod schema;
pub mod service;

pub use descriptor::{
    EntityDescriptor, EntityDescriptorBuilder, FIELD_CREATED_AT, FIELD_ID, FIELD_UPDATED_AT,
    FieldDescriptor, FieldVariant, SchemaError,
};
pub use registry::{EntityRegistry, EntityResource};
pub use schema::{BodySchema, FieldViolation, SchemaMode};
pub use service::{Capabilities, DocumentService, EntityService, ServiceError};
