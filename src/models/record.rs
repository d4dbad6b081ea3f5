use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::{DatabaseError, Scope};
use crate::resources::{Column, ResourceKind};

/// A field-level rule the typed record rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Typed view of one resource row (domain columns only).
///
/// Handlers parse request bodies into the record type to check field
/// types, run `normalize` + `validate`, and store the re-serialized
/// fields. System columns never appear on the record.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;
    const COLUMNS: &'static [Column];

    /// Cross-field checks serde cannot express.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Fill server-computed fields before storage.
    fn normalize(&mut self) {}

    /// Side effects that must commit with the insert.
    fn on_insert(&self, _conn: &Connection, _scope: &Scope) -> Result<(), DatabaseError> {
        Ok(())
    }

    /// Side effects that must commit with the delete.
    fn on_delete(&self, _conn: &Connection, _scope: &Scope) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Serialize a record into its column map.
pub fn to_fields<R: Record>(record: &R) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "record serialized to {other}, expected an object"
        ))),
    }
}

/// Parse a column map into a record. Unknown keys are ignored here;
/// handlers reject them before parsing.
pub fn from_fields<R: Record>(fields: Map<String, Value>) -> Result<R, serde_json::Error> {
    serde_json::from_value(Value::Object(fields))
}

pub(crate) fn require_positive(field: &str, value: i64) -> Result<(), ValidationError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ValidationError::new(field, "must be greater than zero"))
    }
}

pub(crate) fn require_non_negative(field: &str, value: i64) -> Result<(), ValidationError> {
    if value >= 0 {
        Ok(())
    } else {
        Err(ValidationError::new(field, "must not be negative"))
    }
}

pub(crate) fn require_not_blank(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "must not be blank"))
    } else {
        Ok(())
    }
}

/// `later` must not precede `earlier` when both are set.
pub(crate) fn require_ordered<T: PartialOrd>(
    field: &str,
    earlier: Option<&T>,
    later: Option<&T>,
) -> Result<(), ValidationError> {
    match (earlier, later) {
        (Some(a), Some(b)) if b < a => Err(ValidationError::new(field, "must not precede the start")),
        _ => Ok(()),
    }
}
