//! REST endpoint handlers.

pub mod auth;
pub mod compliance;
pub mod health;
pub mod resources;
