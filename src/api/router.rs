//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Rate limiter → 2. API key → 3. Auth validator → 4. Audit logger

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build router from pre-constructed `ApiContext`.
#[cfg(test)]
pub(crate) fn api_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    // Protected routes: API key + bearer session + audit.
    //
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Rate limit → API key → Auth → Audit (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = endpoints::resources::all_routes(Router::new())
        .route("/auth/sign_out", post(endpoints::auth::sign_out))
        .route("/auth/me", get(endpoints::auth::me))
        .route("/users/:id/password", put(endpoints::auth::set_password))
        .route(
            "/compliance_reports/generate",
            post(endpoints::compliance::generate),
        )
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::api_key::require_api_key))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Public routes (API key only, no session)
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/sign_in", post(endpoints::auth::sign_in))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::api_key::require_api_key))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx));

    Router::new().nest("/api", protected).nest("/api", public)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::test_support::{enable_aesthetics, seed_clinic, test_core, TEST_API_KEY};
    use crate::api::types::RateLimiter;
    use crate::resources::ResourceKind;

    struct Harness {
        app: Router,
        ctx: ApiContext,
        _tmp: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ApiContext::new(test_core(&tmp));
        Harness {
            app: api_router_with_ctx(ctx.clone()),
            ctx,
            _tmp: tmp,
        }
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("X-Api-Key", TEST_API_KEY);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn create_patient(app: &Router, token: &str, first: &str) -> String {
        let (status, row) = call(
            app,
            "POST",
            "/api/patients",
            Some(token),
            Some(json!({ "first_name": first, "last_name": "Rivera", "date_of_birth": "1984-06-02" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{row}");
        row["id"].as_str().unwrap().to_string()
    }

    // ── Gatekeeping ─────────────────────────────────────────

    #[tokio::test]
    async fn health_needs_api_key_only() {
        let h = harness();
        let (status, body) = call(&h.app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let response = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_api_key_is_rejected() {
        let h = harness();
        let req = Request::builder()
            .uri("/api/health")
            .header("X-Api-Key", "wrong-key-wrong-key")
            .body(Body::empty())
            .unwrap();
        let response = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["code"], "API_KEY_INVALID");
    }

    #[tokio::test]
    async fn resources_require_session() {
        let h = harness();
        let (status, body) = call(&h.app, "GET", "/api/patients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

        let (status, _) = call(&h.app, "GET", "/api/patients", Some("not-a-session"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn inactive_user_session_is_rejected() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let (status, _) = call(
            &h.app,
            "PUT",
            &format!("/api/users/{}", clinic.staff_id),
            Some(&clinic.admin_token),
            Some(json!({ "active": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&h.app, "GET", "/api/patients", Some(&clinic.staff_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        *h.ctx.rate_limiter.lock().unwrap() = RateLimiter::with_limits(2, 100);

        for _ in 0..2 {
            let (status, _) = call(&h.app, "GET", "/api/patients", Some(&clinic.admin_token), None).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = call(&h.app, "GET", "/api/patients", Some(&clinic.admin_token), None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn unverified_traffic_does_not_grow_the_limiter() {
        let h = harness();
        for i in 0..50 {
            let req = Request::builder()
                .uri("/api/patients")
                .header("Authorization", format!("Bearer junk-token-{i:04}-padding"))
                .body(Body::empty())
                .unwrap();
            let response = h.app.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(h.ctx.rate_limiter.lock().unwrap().tracked_keys(), 1);
    }

    // ── Auth endpoints ──────────────────────────────────────

    #[tokio::test]
    async fn sign_in_me_sign_out() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let (status, _) = call(
            &h.app,
            "PUT",
            &format!("/api/users/{}/password", clinic.staff_id),
            Some(&clinic.admin_token),
            Some(json!({ "password": "front desk secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/auth/sign_in",
            None,
            Some(json!({ "email": "staff@north.test", "password": "wrong password!" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &h.app,
            "POST",
            "/api/auth/sign_in",
            None,
            Some(json!({ "email": "Staff@North.test", "password": "front desk secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "staff");
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = call(&h.app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], clinic.staff_id.to_string());

        let (status, _) = call(&h.app, "POST", "/api/auth/sign_out", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&h.app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn password_change_revokes_sessions_and_needs_admin() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let uri = format!("/api/users/{}/password", clinic.staff_id);

        let (status, _) = call(
            &h.app,
            "PUT",
            &uri,
            Some(&clinic.staff_token),
            Some(json!({ "password": "front desk secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &h.app,
            "PUT",
            &uri,
            Some(&clinic.admin_token),
            Some(json!({ "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &h.app,
            "PUT",
            &uri,
            Some(&clinic.admin_token),
            Some(json!({ "password": "front desk secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&h.app, "GET", "/api/auth/me", Some(&clinic.staff_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // ── Resource CRUD ───────────────────────────────────────

    #[tokio::test]
    async fn crud_round_trip() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let token = clinic.staff_token.as_str();
        let id = create_patient(&h.app, token, "Ana").await;

        let (status, row) = call(&h.app, "GET", &format!("/api/patients/{id}"), Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(row["first_name"], "Ana");
        assert_eq!(row["clinic_id"], clinic.scope.clinic_id.to_string());

        let (status, row) = call(
            &h.app,
            "PUT",
            &format!("/api/patients/{id}"),
            Some(token),
            Some(json!({ "phone": "555-0100" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(row["phone"], "555-0100");
        assert_eq!(row["first_name"], "Ana");

        let (status, body) = call(&h.app, "DELETE", &format!("/api/patients/{id}"), Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "deleted": true, "id": id }));

        let (status, list) = call(&h.app, "GET", "/api/patients", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["patients"], json!([]));
    }

    #[tokio::test]
    async fn list_is_ordered_and_filters_by_patient() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let token = clinic.staff_token.as_str();
        let ana = create_patient(&h.app, token, "Ana").await;
        let ben = create_patient(&h.app, token, "Ben").await;

        for (patient, name) in [(&ana, "Metformin"), (&ben, "Lisinopril"), (&ana, "Atorvastatin")] {
            let (status, _) = call(
                &h.app,
                "POST",
                "/api/medications",
                Some(token),
                Some(json!({ "patient_id": patient, "name": name })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = call(&h.app, "GET", &format!("/api/medications?patient_id={ana}"), Some(token), None).await;
        let names: Vec<&str> = body["medications"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Metformin", "Atorvastatin"]);

        let (_, all) = call(&h.app, "GET", "/api/patients", Some(token), None).await;
        assert_eq!(all["patients"][0]["first_name"], "Ana");
        assert_eq!(all["patients"][1]["first_name"], "Ben");
    }

    #[tokio::test]
    async fn create_rejects_bad_bodies() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let token = Some(clinic.staff_token.as_str());

        let (status, body) = call(&h.app, "POST", "/api/patients", token, Some(json!({ "first_name": "Ana" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/patients",
            token,
            Some(json!({ "first_name": "Ana", "last_name": "R", "id": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/patients",
            token,
            Some(json!({ "first_name": "Ana", "last_name": "R", "shoe_size": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/labs",
            token,
            Some(json!({
                "patient_id": uuid::Uuid::new_v4(), "test_name": "TSH", "collected_on": "2025-01-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&h.app, "GET", "/api/patients/not-a-uuid", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_ignores_stale_references_it_does_not_touch() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let token = clinic.staff_token.as_str();
        let patient = create_patient(&h.app, token, "Ana").await;

        let (status, provider) = call(
            &h.app,
            "POST",
            "/api/users",
            Some(&clinic.admin_token),
            Some(json!({ "email": "dr.lee@north.test", "full_name": "Dr Lee", "role": "provider" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let provider_id = provider["id"].as_str().unwrap().to_string();

        let (status, lab) = call(
            &h.app,
            "POST",
            "/api/labs",
            Some(token),
            Some(json!({
                "patient_id": patient, "test_name": "Glucose", "collected_on": "2025-02-01",
                "ordered_by": provider_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let lab_uri = format!("/api/labs/{}", lab["id"].as_str().unwrap());

        let (status, _) =
            call(&h.app, "DELETE", &format!("/api/users/{provider_id}"), Some(&clinic.admin_token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&h.app, "PUT", &lab_uri, Some(token), Some(json!({ "unit": "mmol/L" }))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["unit"], "mmol/L");

        let (status, _) = call(
            &h.app,
            "PUT",
            &lab_uri,
            Some(token),
            Some(json!({ "ordered_by": provider_id })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tenancy_hides_other_clinic_rows() {
        let h = harness();
        let north = seed_clinic(&h.ctx.core, "North");
        let south = seed_clinic(&h.ctx.core, "South");
        let id = create_patient(&h.app, &north.staff_token, "Ana").await;

        let (status, _) = call(&h.app, "GET", &format!("/api/patients/{id}"), Some(&south.staff_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = call(&h.app, "GET", "/api/patients", Some(&south.staff_token), None).await;
        assert_eq!(list["patients"], json!([]));

        let (status, _) = call(
            &h.app,
            "PUT",
            &format!("/api/patients/{id}"),
            Some(&south.staff_token),
            Some(json!({ "first_name": "Mallory" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&h.app, "DELETE", &format!("/api/patients/{id}"), Some(&south.staff_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/clinical_notes",
            Some(&south.staff_token),
            Some(json!({ "patient_id": id, "body": "cross-tenant" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_policies() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let other = seed_clinic(&h.ctx.core, "South");

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/appointment_types",
            Some(&clinic.staff_token),
            Some(json!({ "name": "Consult", "duration_minutes": 30 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/appointment_types",
            Some(&clinic.admin_token),
            Some(json!({ "name": "Consult", "duration_minutes": 30 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = call(&h.app, "GET", "/api/audit_logs", Some(&clinic.staff_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &h.app,
            "PUT",
            &format!("/api/clinics/{}", other.scope.clinic_id),
            Some(&clinic.admin_token),
            Some(json!({ "name": "Taken over" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn audit_logs_are_append_only() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let (status, row) = call(
            &h.app,
            "POST",
            "/api/audit_logs",
            Some(&clinic.staff_token),
            Some(json!({ "source": "client", "action": "get_patients", "resource_type": "patient" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = row["id"].as_str().unwrap();

        let (status, _) = call(
            &h.app,
            "PUT",
            &format!("/api/audit_logs/{id}"),
            Some(&clinic.admin_token),
            Some(json!({ "action": "nothing" })),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&h.app, "DELETE", &format!("/api/audit_logs/{id}"), Some(&clinic.admin_token), None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn posted_audit_rows_are_always_client_rows() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let (status, row) = call(
            &h.app,
            "POST",
            "/api/audit_logs",
            Some(&clinic.staff_token),
            Some(json!({ "source": "server", "action": "get_labs", "resource_type": "lab" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(row["source"], "client");

        let (_, stored) =
            call(&h.app, "GET", &format!("/api/audit_logs/{}", row["id"].as_str().unwrap()), Some(&clinic.admin_token), None)
                .await;
        assert_eq!(stored["source"], "client");
    }

    // ── Aesthetics module ───────────────────────────────────

    #[tokio::test]
    async fn aesthetics_flag_gates_endpoints() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let clinic_uri = format!("/api/clinics/{}", clinic.scope.clinic_id);

        let (status, body) = call(&h.app, "GET", "/api/inventory_items", Some(&clinic.staff_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FEATURE_DISABLED");

        let (status, row) = call(
            &h.app,
            "PUT",
            &clinic_uri,
            Some(&clinic.admin_token),
            Some(json!({ "aesthetics_enabled": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(row["aesthetics_enabled"], true);

        let (_, reloaded) = call(&h.app, "GET", &clinic_uri, Some(&clinic.staff_token), None).await;
        assert_eq!(reloaded["aesthetics_enabled"], true);

        let (status, _) = call(&h.app, "GET", "/api/inventory_items", Some(&clinic.staff_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn pos_sale_decrements_stock_and_rejects_oversell() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        enable_aesthetics(&h.ctx.core, &clinic.scope.clinic_id);
        let token = Some(clinic.staff_token.as_str());

        let (status, item) = call(
            &h.app,
            "POST",
            "/api/inventory_items",
            token,
            Some(json!({ "sku": "SER-01", "name": "Serum", "unit_price_cents": 4500, "quantity_on_hand": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let item_id = item["id"].as_str().unwrap().to_string();
        let item_uri = format!("/api/inventory_items/{item_id}");

        let (status, sale) = call(
            &h.app,
            "POST",
            "/api/pos_transactions",
            token,
            Some(json!({
                "description": "Serum x3", "quantity": 3, "unit_price_cents": 4500,
                "payment_method": "card", "inventory_item_id": item_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(sale["total_cents"], 13_500);
        let (_, item) = call(&h.app, "GET", &item_uri, token, None).await;
        assert_eq!(item["quantity_on_hand"], 2);

        let (status, body) = call(
            &h.app,
            "POST",
            "/api/pos_transactions",
            token,
            Some(json!({
                "description": "Serum x3", "quantity": 3, "unit_price_cents": 4500,
                "payment_method": "cash", "inventory_item_id": item_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        let (_, item) = call(&h.app, "GET", &item_uri, token, None).await;
        assert_eq!(item["quantity_on_hand"], 2);
        let (_, sales) = call(&h.app, "GET", "/api/pos_transactions", token, None).await;
        assert_eq!(sales["pos_transactions"].as_array().unwrap().len(), 1);

        let sale_id = sale["id"].as_str().unwrap();
        let (status, _) = call(
            &h.app,
            "PUT",
            &format!("/api/pos_transactions/{sale_id}"),
            token,
            Some(json!({ "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&h.app, "DELETE", &format!("/api/pos_transactions/{sale_id}"), token, None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, item) = call(&h.app, "GET", &item_uri, token, None).await;
        assert_eq!(item["quantity_on_hand"], 5);
    }

    #[tokio::test]
    async fn sale_can_be_voided_after_its_item_is_deleted() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        enable_aesthetics(&h.ctx.core, &clinic.scope.clinic_id);
        let token = Some(clinic.staff_token.as_str());

        let (_, item) = call(
            &h.app,
            "POST",
            "/api/inventory_items",
            token,
            Some(json!({ "sku": "MASK-1", "name": "Sheet mask", "unit_price_cents": 900, "quantity_on_hand": 4 })),
        )
        .await;
        let item_id = item["id"].as_str().unwrap().to_string();
        let (status, sale) = call(
            &h.app,
            "POST",
            "/api/pos_transactions",
            token,
            Some(json!({
                "description": "Mask", "quantity": 1, "unit_price_cents": 900,
                "payment_method": "card", "inventory_item_id": item_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let sale_uri = format!("/api/pos_transactions/{}", sale["id"].as_str().unwrap());

        let (status, _) = call(&h.app, "DELETE", &format!("/api/inventory_items/{item_id}"), token, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&h.app, "DELETE", &sale_uri, token, None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let (status, _) = call(&h.app, "GET", &sale_uri, token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ── Audit + compliance ──────────────────────────────────

    #[tokio::test]
    async fn compliance_report_aggregates_audit_trail() {
        let h = harness();
        let clinic = seed_clinic(&h.ctx.core, "North");
        let id = create_patient(&h.app, &clinic.staff_token, "Ana").await;
        call(&h.app, "GET", &format!("/api/patients/{id}"), Some(&clinic.staff_token), None).await;
        call(&h.app, "GET", &format!("/api/labs?patient_id={id}"), Some(&clinic.staff_token), None).await;
        assert_eq!(h.ctx.core.audit_entries().len(), 3);

        let today = chrono::Utc::now().date_naive();
        let (status, report) = call(
            &h.app,
            "POST",
            "/api/compliance_reports/generate",
            Some(&clinic.admin_token),
            Some(json!({
                "title": "Monthly PHI access",
                "report_type": "audit_summary",
                "period_start": today.pred_opt().unwrap(),
                "period_end": today,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{report}");
        assert_eq!(report["status"], "final");

        let summary: Value = serde_json::from_str(report["summary"].as_str().unwrap()).unwrap();
        assert_eq!(summary["total"], 3);
        assert_eq!(summary["by_resource_type"]["patient"], 2);
        assert_eq!(summary["by_resource_type"]["lab"], 1);
        assert_eq!(summary["by_source"]["server"], 3);
        assert_eq!(summary["distinct_patients"], 1);

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/compliance_reports/generate",
            Some(&clinic.staff_token),
            Some(json!({
                "title": "x", "report_type": "phi_access",
                "period_start": today, "period_end": today
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn every_kind_is_routed() {
        // Route registration panics on conflicts; building once covers all kinds.
        let tmp = tempfile::tempdir().unwrap();
        let _ = api_router(test_core(&tmp));
        assert_eq!(ResourceKind::ALL.len(), 17);
    }
}
