//! Create/edit form submission.

use serde_json::{Map, Value};

use super::http::{ApiClient, ClientError, Endpoint};
use crate::resources::{missing_required, EndpointOp, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(String),
}

/// Check required fields, then send exactly one POST or PUT with the
/// payload unchanged. Nothing is sent when a required field is missing.
pub async fn submit_form(
    client: &ApiClient,
    slug: &str,
    mode: &FormMode,
    payload: &Map<String, Value>,
) -> Result<Value, ClientError> {
    let kind = ResourceKind::from_slug(slug)
        .ok_or_else(|| ClientError::Validation(format!("Unknown form {slug}")))?;

    let missing = missing_required(kind, payload);
    if !missing.is_empty() {
        return Err(ClientError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let endpoint = match mode {
        FormMode::Create => Endpoint::new(EndpointOp::Create, kind),
        FormMode::Update(id) => Endpoint::new(EndpointOp::Update, kind).with_id(id),
    };
    let body = Value::Object(payload.clone());
    client.call(&endpoint, Some(&body)).await
}
