//! Domain logic for entity querying
//!
//! - `entity` - entity descriptors, body schemas, services and the registry
//! - `query` - operator registry, filter trees, search queries and the compiler
//! - `sync` - client-side filter state and its debounced synchronizer
//! - `catalog` - the built-in resources served by this binary

pub mod catalog;
pub mod entity;
pub mod query;
pub mod sync;
