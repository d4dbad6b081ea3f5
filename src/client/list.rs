//! Generic list/table view: fetch, client-side search, row actions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};

use super::http::{ApiClient, ClientError, Endpoint};
use crate::resources::EndpointOp;

pub type Row = Map<String, Value>;

/// Per-endpoint retry counter and tripped flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureGate {
    pub failures: u32,
    pub tripped: bool,
    pub last_error: Option<String>,
}

/// Failure gates keyed by endpoint name; clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct FailureGates {
    gates: Arc<Mutex<HashMap<String, FailureGate>>>,
}

impl FailureGates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, endpoint: &str) -> FailureGate {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }

    /// Stored error while the gate is tripped.
    pub fn tripped_error(&self, endpoint: &str) -> Option<String> {
        let gate = self.get(endpoint);
        gate.tripped.then(|| gate.last_error.unwrap_or_default())
    }

    pub fn trip(&self, endpoint: &str, message: String) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = gates.entry(endpoint.to_string()).or_default();
        gate.failures += 1;
        gate.tripped = true;
        gate.last_error = Some(message);
    }

    pub fn reset(&self, endpoint: &str) {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(endpoint);
    }
}

/// Rows whose displayed columns contain `term`, case-insensitively.
/// A blank term keeps every row.
pub fn filter_rows<'a, S: AsRef<str>>(rows: &'a [Row], columns: &[S], term: &str) -> Vec<&'a Row> {
    if term.trim().is_empty() {
        return rows.iter().collect();
    }
    let term = term.to_lowercase();
    rows.iter()
        .filter(|row| {
            columns.iter().any(|col| {
                display_value(row.get(col.as_ref()))
                    .is_some_and(|text| text.to_lowercase().contains(&term))
            })
        })
        .collect()
}

fn display_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Accept a bare array, or an object holding the `slug` array (or the
/// first array-valued field).
pub fn extract_rows(value: Value, slug: &str) -> Result<Vec<Row>, ClientError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut fields) => match fields.remove(slug) {
            Some(Value::Array(items)) => items,
            _ => fields
                .into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| ClientError::Decode(format!("no list in {slug} response")))?,
        },
        _ => return Err(ClientError::Decode(format!("no list in {slug} response"))),
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            other => Err(ClientError::Decode(format!("list item is not a record: {other}"))),
        })
        .collect()
}

pub struct ListView {
    client: ApiClient,
    endpoint: Endpoint,
    columns: Vec<String>,
    rows: Vec<Row>,
    search: String,
    gates: FailureGates,
}

impl ListView {
    /// An empty `columns` slice falls back to the resource's display columns.
    pub fn new(client: ApiClient, endpoint: &str, columns: &[&str]) -> Result<Self, ClientError> {
        let endpoint = Endpoint::parse(endpoint)?;
        if endpoint.op() != EndpointOp::Get {
            return Err(ClientError::Validation(format!(
                "{} is not a list endpoint",
                endpoint.name()
            )));
        }
        let columns = if columns.is_empty() {
            endpoint.kind().display_columns()
        } else {
            columns
        };
        Ok(Self {
            client,
            endpoint,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            search: String::new(),
            gates: FailureGates::new(),
        })
    }

    /// Share a gate registry with other views.
    pub fn with_gates(mut self, gates: FailureGates) -> Self {
        self.gates = gates;
        self
    }

    pub fn for_patient(mut self, patient_id: uuid::Uuid) -> Self {
        self.endpoint = self.endpoint.for_patient(patient_id);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn gate(&self) -> FailureGate {
        self.gates.get(self.endpoint.name())
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    /// Rows matching the current search term.
    pub fn visible_rows(&self) -> Vec<&Row> {
        filter_rows(&self.rows, self.columns.as_slice(), &self.search)
    }

    /// Fetch the list. A tripped gate short-circuits with its stored error.
    pub async fn load(&mut self) -> Result<&[Row], ClientError> {
        let name = self.endpoint.name().to_string();
        if let Some(message) = self.gates.tripped_error(&name) {
            return Err(ClientError::Unavailable {
                endpoint: name,
                message,
            });
        }

        let fetched = self
            .client
            .call(&self.endpoint, None)
            .await
            .and_then(|value| extract_rows(value, self.endpoint.kind().slug()));
        match fetched {
            Ok(rows) => {
                self.rows = rows;
                Ok(&self.rows)
            }
            Err(ClientError::SignedOut) => Err(ClientError::SignedOut),
            Err(e) => {
                tracing::warn!(endpoint = %name, "List fetch failed: {e}");
                self.gates.trip(&name, e.to_string());
                Err(e)
            }
        }
    }

    pub async fn retry(&mut self) -> Result<&[Row], ClientError> {
        self.gates.reset(self.endpoint.name());
        self.load().await
    }

    /// PUT `patch` to one row, then refetch.
    pub async fn edit(&mut self, id: &str, patch: &Value) -> Result<Value, ClientError> {
        let endpoint = Endpoint::new(EndpointOp::Update, self.endpoint.kind()).with_id(id);
        let updated = self.client.call(&endpoint, Some(patch)).await?;
        self.load().await?;
        Ok(updated)
    }

    /// DELETE one row, then refetch.
    pub async fn delete(&mut self, id: &str) -> Result<(), ClientError> {
        let endpoint = Endpoint::new(EndpointOp::Delete, self.endpoint.kind()).with_id(id);
        self.client.call(&endpoint, None).await?;
        self.load().await?;
        Ok(())
    }
}
