//! Data storage layer
//!
//! - `sqlite` - Embedded database backing the document store
//! - `types` - Documents and compiled store requests
//! - `traits` - Repository traits the entity layer depends on
//! - `error` - Unified error type for the layer

pub mod error;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use sqlite::SqliteService;

pub use error::DataError;

pub use traits::DocumentStore;

pub use types::{CompiledQuery, Document, OrderTerm, Predicate, SqlParams, SqlValue};
