//! Shared data types for the store and its callers

mod document;
mod query;

pub use document::Document;
pub use query::{CompiledQuery, OrderTerm, Predicate, SqlParams, SqlValue};
