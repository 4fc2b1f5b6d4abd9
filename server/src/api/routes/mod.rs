//! API route handlers

pub mod crud;
pub mod entities;
pub mod health;
