//! SQLite repositories
//!
//! Types (Document, CompiledQuery, etc.) should be imported from `crate::data::types`.

pub mod document;

pub use document::{
    count_documents, count_entity, delete_document, find_documents, get_document,
    insert_document, update_document,
};
