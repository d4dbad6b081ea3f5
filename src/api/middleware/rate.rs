//! Rate limiting, 300 requests a minute and 5000 an hour per caller.
//!
//! Runs ahead of the API-key check, so a caller only gets its own bucket
//! (keyed by bearer prefix) once it presents the right key. Everything
//! else shares the `unverified` bucket.

use axum::body::Body;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::middleware::api_key::API_KEY_HEADER;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

const UNVERIFIED: &str = "unverified";
const ANONYMOUS: &str = "anonymous";
const TOKEN_PREFIX_LEN: usize = 16;

fn rate_key(core: &CoreState, headers: &HeaderMap) -> String {
    let key_ok = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|presented| core.api_key_matches(presented));
    if !key_ok {
        return UNVERIFIED.to_string();
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        Some(token) => format!("token:{}", token.chars().take(TOKEN_PREFIX_LEN).collect::<String>()),
        None => ANONYMOUS.to_string(),
    }
}

pub async fn limit(req: Request<Body>, next: Next) -> Response {
    let Some(ctx) = req.extensions().get::<ApiContext>().cloned() else {
        return ApiError::Internal("missing API context".into()).into_response();
    };
    let key = rate_key(&ctx.core, req.headers());

    let verdict = match ctx.rate_limiter.lock() {
        Ok(mut limiter) => limiter.check(&key),
        Err(_) => return ApiError::Internal("rate limiter lock poisoned".into()).into_response(),
    };
    if let Err(retry_after) = verdict {
        tracing::warn!(bucket = %key, retry_after, "Rate limit exceeded");
        return ApiError::RateLimited { retry_after }.into_response();
    }

    next.run(req).await
}
