//! Generic CRUD endpoints, one set per resource kind.
//!
//! - `GET    /api/<slug>`     list (optionally `?patient_id=`)
//! - `GET    /api/<slug>/:id` fetch one
//! - `POST   /api/<slug>`     create, 201
//! - `PUT    /api/<slug>/:id` partial update
//! - `DELETE /api/<slug>/:id` delete
//!
//! Handlers are generic over the typed `Record`, which supplies the
//! resource kind and its validation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::db::{self, Row, RowFilter};
use crate::models::{self, Record};
use crate::resources::{
    missing_required, ReadPolicy, ResourceKind, WritePolicy, SYSTEM_COLUMNS,
};

/// Mount the five CRUD routes for `R` on `router`.
pub fn routes<R: Record>(router: Router<ApiContext>) -> Router<ApiContext> {
    let slug = R::KIND.slug();
    router
        .route(&format!("/{slug}"), get(list::<R>).post(create::<R>))
        .route(
            &format!("/{slug}/:id"),
            get(fetch::<R>).put(update::<R>).delete(remove::<R>),
        )
}

/// Mount CRUD routes for every resource kind.
pub fn all_routes(router: Router<ApiContext>) -> Router<ApiContext> {
    let router = routes::<models::Organization>(router);
    let router = routes::<models::Clinic>(router);
    let router = routes::<models::User>(router);
    let router = routes::<models::Patient>(router);
    let router = routes::<models::AppointmentType>(router);
    let router = routes::<models::Appointment>(router);
    let router = routes::<models::Lab>(router);
    let router = routes::<models::Medication>(router);
    let router = routes::<models::Supplement>(router);
    let router = routes::<models::TreatmentPlan>(router);
    let router = routes::<models::TimelineEvent>(router);
    let router = routes::<models::ClinicalNote>(router);
    let router = routes::<models::Membership>(router);
    let router = routes::<models::InventoryItem>(router);
    let router = routes::<models::PosTransaction>(router);
    let router = routes::<models::ComplianceReport>(router);
    routes::<models::AuditLog>(router)
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub patient_id: Option<String>,
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid id: {raw}")))
}

fn not_found(kind: ResourceKind, id: &Uuid) -> ApiError {
    ApiError::NotFound(format!("{} {id} not found", kind.slug()))
}

pub(crate) fn require_admin(auth: &AuthContext, what: &str) -> Result<(), ApiError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("{what} requires an admin")))
    }
}

/// Read policy plus the aesthetics module gate.
fn check_read(conn: &Connection, auth: &AuthContext, kind: ResourceKind) -> Result<(), ApiError> {
    if kind.read_policy() == ReadPolicy::AdminOnly {
        require_admin(auth, &format!("reading {}", kind.slug()))?;
    }
    check_feature(conn, auth, kind)
}

fn check_feature(conn: &Connection, auth: &AuthContext, kind: ResourceKind) -> Result<(), ApiError> {
    if kind.requires_aesthetics() && !db::clinic_aesthetics_enabled(conn, &auth.clinic_id)? {
        return Err(ApiError::FeatureDisabled("aesthetics"));
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Write {
    Create,
    Update,
    Delete,
}

fn check_write(
    conn: &Connection,
    auth: &AuthContext,
    kind: ResourceKind,
    op: Write,
) -> Result<(), ApiError> {
    match (kind.write_policy(), op) {
        (WritePolicy::AppendOnly, Write::Update | Write::Delete) => {
            return Err(ApiError::MethodNotAllowed(format!("{} are append-only", kind.slug())));
        }
        (WritePolicy::CreateDelete, Write::Update) => {
            return Err(ApiError::MethodNotAllowed(format!(
                "{} cannot be edited; delete to void",
                kind.slug()
            )));
        }
        (WritePolicy::AdminOnly, _) => require_admin(auth, &format!("changing {}", kind.slug()))?,
        _ => {}
    }
    check_feature(conn, auth, kind)
}

/// Tenant tables are global; an admin may only change their own clinic
/// and its organization.
fn check_tenant_row(
    conn: &Connection,
    auth: &AuthContext,
    kind: ResourceKind,
    id: &Uuid,
) -> Result<(), ApiError> {
    let own = match kind {
        ResourceKind::Clinics => *id == auth.clinic_id,
        ResourceKind::Organizations => {
            let clinic = db::get_row(conn, ResourceKind::Clinics, &auth.scope(), &auth.clinic_id)?;
            clinic
                .as_ref()
                .and_then(|row| row.get("organization_id"))
                .and_then(Value::as_str)
                == Some(id.to_string().as_str())
        }
        _ => true,
    };
    if own {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("{} {id} belongs to another tenant", kind.slug())))
    }
}

/// Reject server-managed and unknown fields.
fn check_fields(kind: ResourceKind, body: &Map<String, Value>) -> Result<(), ApiError> {
    for key in body.keys() {
        if SYSTEM_COLUMNS.contains(&key.as_str()) {
            return Err(ApiError::BadRequest(format!("{key} is set by the server")));
        }
        if kind.column(key).is_none() {
            return Err(ApiError::BadRequest(format!(
                "unknown field {key} for {}",
                kind.slug()
            )));
        }
    }
    Ok(())
}

fn body_object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest("request body must be a JSON object".into())),
    }
}

/// Parse, normalize and validate a full column map into storable fields.
pub(crate) fn prepare<R: Record>(fields: Map<String, Value>) -> Result<(R, Row), ApiError> {
    let missing = missing_required(R::KIND, &fields);
    if !missing.is_empty() {
        return Err(ApiError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }
    let mut record: R = models::from_fields(fields)
        .map_err(|e| ApiError::BadRequest(format!("invalid {}: {e}", R::KIND.slug())))?;
    record.normalize();
    record.validate()?;
    let fields = models::to_fields(&record)?;
    Ok((record, fields))
}

/// `GET /api/<slug>`
pub async fn list<R: Record>(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let kind = R::KIND;
    let filter = RowFilter {
        patient_id: query.patient_id.as_deref().map(parse_id).transpose()?,
    };

    let conn = ctx.core.open_db()?;
    check_read(&conn, &auth, kind)?;
    let rows = db::list_rows(&conn, kind, &auth.scope(), &filter)?;

    tracing::debug!(resource = kind.slug(), count = rows.len(), "listed");
    let mut body = Map::new();
    body.insert(kind.list_field().to_string(), Value::Array(rows.into_iter().map(Value::Object).collect()));
    Ok(Json(Value::Object(body)))
}

/// `GET /api/<slug>/:id`
pub async fn fetch<R: Record>(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Row>, ApiError> {
    let kind = R::KIND;
    let id = parse_id(&id)?;
    let conn = ctx.core.open_db()?;
    check_read(&conn, &auth, kind)?;
    let row = db::get_row(&conn, kind, &auth.scope(), &id)?.ok_or_else(|| not_found(kind, &id))?;
    Ok(Json(row))
}

/// `POST /api/<slug>`
pub async fn create<R: Record>(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Row>), ApiError> {
    let kind = R::KIND;
    let body = body_object(body)?;
    check_fields(kind, &body)?;
    let (record, fields) = prepare::<R>(body)?;

    let mut conn = ctx.core.open_db()?;
    check_write(&conn, &auth, kind, Write::Create)?;
    let scope = auth.scope();

    let tx = conn.transaction()?;
    let row = db::insert_row(&tx, kind, &scope, &fields)?;
    record.on_insert(&tx, &scope)?;
    tx.commit()?;

    tracing::info!(resource = kind.slug(), id = ?row.get("id"), "created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PUT /api/<slug>/:id`: supplied fields are merged over the stored row.
pub async fn update<R: Record>(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Row>, ApiError> {
    let kind = R::KIND;
    let id = parse_id(&id)?;
    let patch = body_object(body)?;
    check_fields(kind, &patch)?;

    let conn = ctx.core.open_db()?;
    check_write(&conn, &auth, kind, Write::Update)?;
    check_tenant_row(&conn, &auth, kind, &id)?;
    let scope = auth.scope();

    let existing = db::get_row(&conn, kind, &scope, &id)?.ok_or_else(|| not_found(kind, &id))?;
    // Only references the patch touches; stored ones may point at rows
    // deleted since.
    db::check_references(&conn, kind, &scope, &patch)?;
    let mut merged = db::domain_fields(kind, &existing);
    merged.extend(patch);
    let (_, fields) = prepare::<R>(merged)?;

    let row = db::update_row(&conn, kind, &scope, &id, &fields)?.ok_or_else(|| not_found(kind, &id))?;
    tracing::info!(resource = kind.slug(), %id, "updated");
    Ok(Json(row))
}

/// `DELETE /api/<slug>/:id`
pub async fn remove<R: Record>(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let kind = R::KIND;
    let id = parse_id(&id)?;

    let mut conn = ctx.core.open_db()?;
    check_write(&conn, &auth, kind, Write::Delete)?;
    check_tenant_row(&conn, &auth, kind, &id)?;
    let scope = auth.scope();

    let tx = conn.transaction()?;
    let existing = db::get_row(&tx, kind, &scope, &id)?.ok_or_else(|| not_found(kind, &id))?;
    let record: R = models::from_fields(db::domain_fields(kind, &existing))?;
    record.on_delete(&tx, &scope)?;
    if !db::delete_row(&tx, kind, &scope, &id)? {
        return Err(not_found(kind, &id));
    }
    tx.commit()?;

    tracing::info!(resource = kind.slug(), %id, "deleted");
    Ok(Json(json!({ "deleted": true, "id": id })))
}
