//! Typed client for the records API: session, call wrapper, list view,
//! forms and admin settings.

pub mod admin;
pub mod audit;
pub mod forms;
pub mod http;
pub mod list;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::{clinic_aesthetics_enabled, set_clinic_aesthetics};
pub use forms::{submit_form, FormMode};
pub use http::{ApiClient, ClientError, Endpoint};
pub use list::{filter_rows, FailureGate, FailureGates, ListView, Row};
pub use session::{CurrentUser, RedirectToLogin, SessionHandle, SignOutHook};
