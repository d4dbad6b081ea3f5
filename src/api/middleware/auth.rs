//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves the session in
//! SQLite, and injects `AuthContext` into request extensions for
//! downstream handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{token_hash_hex, ApiContext, AuthContext};
use crate::db;

/// Require a live session token belonging to an active user.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
/// On success: injects `AuthContext` and marks the response `no-store`.
pub async fn require_auth(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    // 1. Extract bearer token
    let token_hash = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(token_hash_hex)
        .ok_or(ApiError::Unauthorized)?;

    // 2. Resolve session (connection dropped before any .await)
    let account = {
        let conn = ctx.core.open_db()?;
        db::lookup_session(&conn, &token_hash, &chrono::Utc::now())?
    }
    .ok_or(ApiError::Unauthorized)?;

    if !account.active {
        tracing::info!(user_id = %account.id, "Session rejected for inactive user");
        return Err(ApiError::Unauthorized);
    }

    // 3. Inject auth context for downstream handlers
    req.extensions_mut().insert(AuthContext {
        user_id: account.id,
        clinic_id: account.clinic_id,
        role: account.role,
        token_hash,
    });

    // 4. Process request
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}
