//! Server-side audit logging middleware.
//!
//! Records every authenticated request as `METHOD path` with the
//! response status. Runs innermost (after auth has injected AuthContext).

use axum::extract::OriginalUri;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::types::{ApiContext, AuthContext};
use crate::db::AuditEntry;
use crate::models::enums::AuditSource;
use crate::resources::ResourceKind;

/// Resource type and id named by an `/api/<slug>[/<id>]` path.
fn resource_of(path: &str) -> (String, Option<String>) {
    let mut segments = path
        .trim_start_matches('/')
        .strip_prefix("api/")
        .unwrap_or(path)
        .split('/')
        .filter(|s| !s.is_empty());
    let slug = segments.next().unwrap_or_default();
    let resource_type = ResourceKind::from_slug(slug)
        .map(|kind| kind.audit_resource_type().unwrap_or(kind.slug()).to_string())
        .unwrap_or_else(|| if slug.is_empty() { "api".to_string() } else { slug.to_string() });
    let resource_id = segments
        .next()
        .filter(|s| Uuid::parse_str(s).is_ok())
        .map(str::to_string);
    (resource_type, resource_id)
}

/// `patient_id` from the query string, when it is a UUID.
fn patient_of(query: Option<&str>) -> Option<Uuid> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "patient_id")
        .and_then(|(_, v)| Uuid::parse_str(v).ok())
}

/// Log API access for audit trail.
/// Accesses `ApiContext` from request extensions.
pub async fn log_access(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    // Nested routers see a stripped path; audit the one the client sent.
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let patient_id = patient_of(req.uri().query());

    let ctx = req.extensions().get::<ApiContext>().cloned();
    let auth = req.extensions().get::<AuthContext>().cloned();

    let response = next.run(req).await;

    if let (Some(ctx), Some(auth)) = (ctx, auth) {
        let (resource_type, resource_id) = resource_of(&path);
        ctx.core.log_access(AuditEntry {
            at: chrono::Utc::now(),
            clinic_id: auth.clinic_id,
            user_id: auth.user_id,
            source: AuditSource::Server,
            action: format!("{method} {path}"),
            resource_type,
            resource_id,
            patient_id,
            detail: Some(response.status().as_u16().to_string()),
        });
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_of_maps_slug_to_audit_type() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(
            resource_of(&format!("/api/patients/{id}")),
            ("patient".to_string(), Some(id))
        );
        assert_eq!(resource_of("/api/inventory_items"), ("inventory_items".to_string(), None));
        assert_eq!(resource_of("/api/auth/me"), ("auth".to_string(), None));
        assert_eq!(
            resource_of("/api/compliance_reports/generate"),
            ("compliance_reports".to_string(), None)
        );
    }

    #[test]
    fn patient_of_reads_query() {
        let id = Uuid::new_v4();
        assert_eq!(patient_of(Some(&format!("x=1&patient_id={id}"))), Some(id));
        assert_eq!(patient_of(Some("patient_id=nope")), None);
        assert_eq!(patient_of(None), None);
    }
}
