//! Repository layer: clinic-scoped database operations.
//!
//! `rows` is the generic store every resource endpoint goes through. The
//! other sub-modules own tables or side effects that are not plain
//! resource CRUD.

mod audit;
mod auth;
mod inventory;
mod rows;
mod tenants;

pub use audit::*;
pub use auth::*;
pub use inventory::*;
pub use rows::*;
pub use tenants::*;
