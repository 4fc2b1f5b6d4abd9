//! QueryForge server library
//!
//! Typed filter trees compiled to SQL, CRUD routes generated from entity
//! descriptors, and a debounced client-side filter synchronizer.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
