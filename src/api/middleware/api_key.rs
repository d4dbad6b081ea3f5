//! Deployment API key check.
//!
//! Every request must carry `X-Api-Key`. The key is compared in
//! constant time against the SHA-256 held in `CoreState`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Reject requests without a valid API key (401 `API_KEY_INVALID`).
pub async fn require_api_key(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<ApiContext>().cloned() else {
        return ApiError::Internal("missing API context".into()).into_response();
    };

    let valid = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| ctx.core.api_key_matches(key));

    if !valid {
        tracing::debug!(path = %req.uri().path(), "Rejected request with bad API key");
        return ApiError::ApiKeyInvalid.into_response();
    }
    next.run(req).await
}
