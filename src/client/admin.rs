//! Admin settings: per-clinic feature flags.

use serde_json::{json, Value};
use uuid::Uuid;

use super::http::{ApiClient, ClientError, Endpoint};
use crate::resources::{EndpointOp, ResourceKind};

fn aesthetics_flag(row: &Value) -> Result<bool, ClientError> {
    row.get("aesthetics_enabled")
        .and_then(Value::as_bool)
        .ok_or_else(|| ClientError::Decode("clinic has no aesthetics_enabled flag".into()))
}

/// Persist the aesthetics flag; returns the stored value.
pub async fn set_clinic_aesthetics(
    client: &ApiClient,
    clinic_id: &Uuid,
    enabled: bool,
) -> Result<bool, ClientError> {
    let endpoint = Endpoint::new(EndpointOp::Update, ResourceKind::Clinics).with_id(clinic_id);
    let row = client
        .call(&endpoint, Some(&json!({ "aesthetics_enabled": enabled })))
        .await?;
    let stored = aesthetics_flag(&row)?;
    tracing::info!(%clinic_id, enabled = stored, "Aesthetics module toggled");
    Ok(stored)
}

pub async fn clinic_aesthetics_enabled(client: &ApiClient, clinic_id: &Uuid) -> Result<bool, ClientError> {
    let endpoint = Endpoint::new(EndpointOp::Get, ResourceKind::Clinics).with_id(clinic_id);
    let row = client.call(&endpoint, None).await?;
    aesthetics_flag(&row)
}
