//! REST API.
//!
//! Exposes every clinic resource as JSON CRUD endpoints under `/api/`,
//! plus sign-in and compliance report generation. Protected routes run
//! behind a middleware stack: Rate Limit → API Key → Auth → Audit.
//!
//! The router is composable: `api_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
