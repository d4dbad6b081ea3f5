//! Authentication endpoints.
//!
//! * `POST /api/auth/sign_in`: public (API key only), email + password → bearer token
//! * `POST /api/auth/sign_out`: revoke the presented token
//! * `GET  /api/auth/me`: current user
//! * `PUT  /api/users/:id/password`: admin only, set a user's password

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::endpoints::resources::{parse_id, require_admin};
use crate::api::error::ApiError;
use crate::api::types::{generate_token, token_hash_hex, ApiContext, AuthContext};
use crate::crypto;
use crate::db::{self, AuditEntry, UserAccount};
use crate::models::enums::AuditSource;
use crate::resources::ResourceKind;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserAccount,
}

/// `POST /api/auth/sign_in`
pub async fn sign_in(
    State(ctx): State<ApiContext>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let conn = ctx.core.open_db()?;

    let account = db::find_user_by_email(&conn, &request.email)?
        .filter(|a| a.active)
        .ok_or(ApiError::InvalidCredentials)?;
    let stored = db::get_password_hash(&conn, &account.id)?.ok_or(ApiError::InvalidCredentials)?;
    if let Err(e) = crypto::verify_password(&request.password, &stored) {
        tracing::warn!(user_id = %account.id, "Sign-in rejected");
        return Err(e.into());
    }

    let now = Utc::now();
    let token = generate_token();
    let expires_at = now + ctx.core.session_ttl;
    db::prune_expired_sessions(&conn, &now)?;
    db::create_session(&conn, &token_hash_hex(&token), &account.id, &expires_at)?;

    ctx.core.log_access(AuditEntry {
        at: now,
        clinic_id: account.clinic_id,
        user_id: account.id,
        source: AuditSource::Server,
        action: "sign_in".into(),
        resource_type: "auth".into(),
        resource_id: Some(account.id.to_string()),
        patient_id: None,
        detail: None,
    });
    tracing::info!(user_id = %account.id, "Signed in");

    Ok(Json(SignInResponse {
        token,
        expires_at,
        user: account,
    }))
}

/// `POST /api/auth/sign_out`
pub async fn sign_out(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_session(&conn, &auth.token_hash)?;
    tracing::info!(user_id = %auth.user_id, "Signed out");
    Ok(Json(json!({ "signed_out": true })))
}

/// `GET /api/auth/me`
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserAccount>, ApiError> {
    let conn = ctx.core.open_db()?;
    let account = db::get_user_account(&conn, &auth.user_id)?.ok_or(ApiError::Unauthorized)?;
    Ok(Json(account))
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

/// `PUT /api/users/:id/password`: also revokes the user's sessions.
pub async fn set_password(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(request): Json<SetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth, "setting passwords")?;
    let user_id = parse_id(&id)?;

    let conn = ctx.core.open_db()?;
    if db::get_row(&conn, ResourceKind::Users, &auth.scope(), &user_id)?.is_none() {
        return Err(ApiError::NotFound(format!("users {user_id} not found")));
    }

    let hash = crypto::hash_password(&request.password)?;
    db::set_password_hash(&conn, &user_id, &hash)?;
    let revoked = db::delete_sessions_for_user(&conn, &user_id)?;

    tracing::info!(%user_id, revoked, "Credentials updated");
    Ok(Json(json!({ "updated": true, "id": user_id })))
}
