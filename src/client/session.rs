//! Client session context.
//!
//! One `SessionHandle` is created per signed-in user and handed to the
//! `ApiClient`. Cloning shares the same session.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use uuid::Uuid;

use crate::models::enums::UserRole;

/// The signed-in user as returned by `sign_in` and `me`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub active: bool,
}

#[derive(Debug, Default)]
pub struct Session {
    token: Option<String>,
    user: Option<CurrentUser>,
    selected_patient: Option<Uuid>,
    /// Route the UI should show; set by sign-out hooks.
    location: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session already holding a bearer token (restored from storage).
    pub fn with_token(token: impl Into<String>) -> Self {
        let handle = Self::new();
        handle.establish(token.into(), None);
        handle
    }

    pub fn establish(&self, token: String, user: Option<CurrentUser>) {
        let mut session = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        session.token = Some(token);
        session.user = user;
        session.location = None;
    }

    /// Drop the token, user and patient selection.
    pub fn sign_out(&self) {
        let mut session = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        session.token = None;
        session.user = None;
        session.selected_patient = None;
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).token.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).token.is_some()
    }

    pub fn user(&self) -> Option<CurrentUser> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).user.clone()
    }

    pub fn select_patient(&self, patient_id: Option<Uuid>) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).selected_patient = patient_id;
    }

    pub fn selected_patient(&self) -> Option<Uuid> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).selected_patient
    }

    pub fn navigate(&self, route: &str) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).location = Some(route.to_string());
    }

    pub fn location(&self) -> Option<String> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).location.clone()
    }
}

/// Runs after a forced sign-out (HTTP 401).
pub trait SignOutHook: Send + Sync {
    fn on_sign_out(&self, session: &SessionHandle);
}

/// Sends the user back to the login route.
#[derive(Debug, Clone)]
pub struct RedirectToLogin {
    pub login_route: String,
}

impl SignOutHook for RedirectToLogin {
    fn on_sign_out(&self, session: &SessionHandle) {
        session.navigate(&self.login_route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = SessionHandle::new();
        let b = a.clone();
        a.establish("tok".into(), None);
        assert_eq!(b.token().as_deref(), Some("tok"));
        assert!(b.is_signed_in());
    }

    #[test]
    fn sign_out_clears_identity_and_patient() {
        let session = SessionHandle::with_token("tok");
        let patient = Uuid::new_v4();
        session.select_patient(Some(patient));
        assert_eq!(session.selected_patient(), Some(patient));

        session.sign_out();
        assert!(!session.is_signed_in());
        assert!(session.user().is_none());
        assert!(session.selected_patient().is_none());
    }

    #[test]
    fn redirect_hook_records_login_route() {
        let session = SessionHandle::with_token("tok");
        RedirectToLogin { login_route: "/login".into() }.on_sign_out(&session);
        assert_eq!(session.location().as_deref(), Some("/login"));

        session.establish("again".into(), None);
        assert!(session.location().is_none());
    }

    #[test]
    fn current_user_reads_server_account() {
        let id = Uuid::new_v4();
        let clinic = Uuid::new_v4();
        let user: CurrentUser = serde_json::from_value(serde_json::json!({
            "id": id,
            "clinic_id": clinic,
            "email": "a@b.test",
            "full_name": "A B",
            "role": "provider",
            "active": true
        }))
        .unwrap();
        assert_eq!(user.role, UserRole::Provider);
        assert_eq!(user.clinic_id, clinic);
    }
}
