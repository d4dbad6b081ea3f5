//! Generic row storage for every resource table.
//!
//! Rows travel as JSON maps. Column metadata from the resource catalog
//! decides how each JSON value is bound and how each SQLite value reads
//! back (booleans are stored as 0/1). All statements are scoped: on
//! clinic tables every read and write also matches `clinic_id`.

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::resources::{Column, ColumnType, ResourceKind, Tenancy};

/// One stored row: system columns plus domain columns.
pub type Row = Map<String, Value>;

/// Caller identity that every statement is scoped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub clinic_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    /// Only honoured on patient-scoped resources.
    pub patient_id: Option<Uuid>,
}

/// RFC 3339 UTC with fixed precision so text ordering is time ordering.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn system_columns(kind: ResourceKind) -> Vec<&'static str> {
    let mut cols = vec!["id"];
    if kind.tenancy() == Tenancy::Clinic {
        cols.push("clinic_id");
    }
    cols.extend(["created_by", "created_at", "updated_at"]);
    cols
}

fn select_list(kind: ResourceKind) -> String {
    system_columns(kind)
        .into_iter()
        .chain(kind.columns().iter().map(|c| c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_row(kind: ResourceKind, row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let mut out = Map::new();
    let system = system_columns(kind);
    for (idx, name) in system.iter().enumerate() {
        let value: Option<String> = row.get(idx)?;
        out.insert(name.to_string(), value.map(Value::String).unwrap_or(Value::Null));
    }
    for (offset, col) in kind.columns().iter().enumerate() {
        let raw: SqlValue = row.get(system.len() + offset)?;
        out.insert(col.name.to_string(), sql_to_json(col.ty, raw));
    }
    Ok(out)
}

fn sql_to_json(ty: ColumnType, value: SqlValue) -> Value {
    match (ty, value) {
        (_, SqlValue::Null) => Value::Null,
        (ColumnType::Bool, SqlValue::Integer(i)) => Value::Bool(i != 0),
        (_, SqlValue::Integer(i)) => Value::Number(i.into()),
        (_, SqlValue::Real(f)) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        (_, SqlValue::Text(s)) => Value::String(s),
        (_, SqlValue::Blob(_)) => Value::Null,
    }
}

fn json_to_sql(col: &Column, value: &Value) -> Result<SqlValue, DatabaseError> {
    let mismatch = || DatabaseError::Conversion {
        column: col.name.to_string(),
        reason: format!("expected {:?}, got {value}", col.ty),
    };
    match (col.ty, value) {
        (_, Value::Null) => Ok(SqlValue::Null),
        (
            ColumnType::Text | ColumnType::Uuid | ColumnType::Date | ColumnType::DateTime,
            Value::String(s),
        ) => Ok(SqlValue::Text(s.clone())),
        (ColumnType::Integer, Value::Number(n)) => {
            n.as_i64().map(SqlValue::Integer).ok_or_else(mismatch)
        }
        (ColumnType::Real, Value::Number(n)) => n.as_f64().map(SqlValue::Real).ok_or_else(mismatch),
        (ColumnType::Bool, Value::Bool(b)) => Ok(SqlValue::Integer(i64::from(*b))),
        _ => Err(mismatch()),
    }
}

fn map_write_error(err: rusqlite::Error) -> DatabaseError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            return DatabaseError::ConstraintViolation(
                message.clone().unwrap_or_else(|| failure.to_string()),
            );
        }
    }
    DatabaseError::Sqlite(err)
}

/// `WHERE id = ? [AND clinic_id = ?]` plus its parameters.
fn id_clause(kind: ResourceKind, scope: &Scope, id: &Uuid) -> (String, Vec<SqlValue>) {
    match kind.tenancy() {
        Tenancy::Global => ("id = ?".to_string(), vec![SqlValue::Text(id.to_string())]),
        Tenancy::Clinic => (
            "id = ? AND clinic_id = ?".to_string(),
            vec![
                SqlValue::Text(id.to_string()),
                SqlValue::Text(scope.clinic_id.to_string()),
            ],
        ),
    }
}

/// Whether `id` names a row of `kind` visible in `scope`.
pub fn row_exists(
    conn: &Connection,
    kind: ResourceKind,
    scope: &Scope,
    id: &Uuid,
) -> Result<bool, DatabaseError> {
    let (clause, params) = id_clause(kind, scope, id);
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE {clause}", kind.table()),
            params_from_iter(params),
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Every referencing column present in `fields` must name a row the
/// caller can see.
pub fn check_references(
    conn: &Connection,
    kind: ResourceKind,
    scope: &Scope,
    fields: &Row,
) -> Result<(), DatabaseError> {
    for col in kind.columns() {
        let Some(target) = col.references else { continue };
        let Some(Value::String(raw)) = fields.get(col.name) else { continue };
        let invalid = || DatabaseError::InvalidReference {
            column: col.name.to_string(),
            id: raw.clone(),
        };
        let id = Uuid::parse_str(raw).map_err(|_| invalid())?;
        if !row_exists(conn, target, scope, &id)? {
            return Err(invalid());
        }
    }
    Ok(())
}

/// Keep only the client-settable columns of a stored row.
pub fn domain_fields(kind: ResourceKind, row: &Row) -> Row {
    kind.columns()
        .iter()
        .filter_map(|c| row.get(c.name).map(|v| (c.name.to_string(), v.clone())))
        .collect()
}

pub fn insert_row(
    conn: &Connection,
    kind: ResourceKind,
    scope: &Scope,
    fields: &Row,
) -> Result<Row, DatabaseError> {
    check_references(conn, kind, scope, fields)?;

    let id = Uuid::new_v4();
    let now = now_timestamp();

    let mut names: Vec<&str> = vec!["id"];
    let mut values: Vec<SqlValue> = vec![SqlValue::Text(id.to_string())];
    if kind.tenancy() == Tenancy::Clinic {
        names.push("clinic_id");
        values.push(SqlValue::Text(scope.clinic_id.to_string()));
    }
    names.extend(["created_by", "created_at", "updated_at"]);
    values.extend([
        SqlValue::Text(scope.user_id.to_string()),
        SqlValue::Text(now.clone()),
        SqlValue::Text(now),
    ]);
    for col in kind.columns() {
        names.push(col.name);
        values.push(json_to_sql(col, fields.get(col.name).unwrap_or(&Value::Null))?);
    }

    let placeholders = vec!["?"; names.len()].join(", ");
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            kind.table(),
            names.join(", ")
        ),
        params_from_iter(values),
    )
    .map_err(map_write_error)?;

    get_row(conn, kind, scope, &id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: kind.slug().into(),
        id: id.to_string(),
    })
}

pub fn get_row(
    conn: &Connection,
    kind: ResourceKind,
    scope: &Scope,
    id: &Uuid,
) -> Result<Option<Row>, DatabaseError> {
    let (clause, params) = id_clause(kind, scope, id);
    let row = conn
        .query_row(
            &format!("SELECT {} FROM {} WHERE {clause}", select_list(kind), kind.table()),
            params_from_iter(params),
            |row| read_row(kind, row),
        )
        .optional()?;
    Ok(row)
}

pub fn list_rows(
    conn: &Connection,
    kind: ResourceKind,
    scope: &Scope,
    filter: &RowFilter,
) -> Result<Vec<Row>, DatabaseError> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();
    if kind.tenancy() == Tenancy::Clinic {
        conditions.push("clinic_id = ?");
        params.push(SqlValue::Text(scope.clinic_id.to_string()));
    }
    if let Some(patient_id) = filter.patient_id.filter(|_| kind.is_patient_scoped()) {
        conditions.push("patient_id = ?");
        params.push(SqlValue::Text(patient_id.to_string()));
    }
    let where_sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {}{where_sql} ORDER BY created_at, id",
        select_list(kind),
        kind.table()
    ))?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| read_row(kind, row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overwrite every domain column. Returns `None` when the row is not
/// visible in `scope`. References are not re-checked here: callers check
/// the columns they are changing with [`check_references`].
pub fn update_row(
    conn: &Connection,
    kind: ResourceKind,
    scope: &Scope,
    id: &Uuid,
    fields: &Row,
) -> Result<Option<Row>, DatabaseError> {
    let mut assignments: Vec<String> = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();
    for col in kind.columns() {
        assignments.push(format!("{} = ?", col.name));
        values.push(json_to_sql(col, fields.get(col.name).unwrap_or(&Value::Null))?);
    }
    assignments.push("updated_at = ?".to_string());
    values.push(SqlValue::Text(now_timestamp()));

    let (clause, id_params) = id_clause(kind, scope, id);
    values.extend(id_params);

    let changed = conn
        .execute(
            &format!(
                "UPDATE {} SET {} WHERE {clause}",
                kind.table(),
                assignments.join(", ")
            ),
            params_from_iter(values),
        )
        .map_err(map_write_error)?;

    if changed == 0 {
        return Ok(None);
    }
    get_row(conn, kind, scope, id)
}

pub fn delete_row(
    conn: &Connection,
    kind: ResourceKind,
    scope: &Scope,
    id: &Uuid,
) -> Result<bool, DatabaseError> {
    let (clause, params) = id_clause(kind, scope, id);
    let deleted = conn
        .execute(
            &format!("DELETE FROM {} WHERE {clause}", kind.table()),
            params_from_iter(params),
        )
        .map_err(map_write_error)?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{seed_clinic, test_db};
    use serde_json::json;

    fn fields(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn patient_fields(first: &str) -> Row {
        fields(json!({
            "first_name": first,
            "last_name": "Rivera",
            "date_of_birth": "1984-06-02",
            "sex": null, "email": null, "phone": null,
            "address": null, "mrn": "MRN-1", "notes": null
        }))
    }

    #[test]
    fn insert_sets_system_columns() {
        let conn = test_db();
        let scope = seed_clinic(&conn, "North");
        let row = insert_row(&conn, ResourceKind::Patients, &scope, &patient_fields("Ana")).unwrap();

        assert_eq!(row["first_name"], "Ana");
        assert_eq!(row["clinic_id"], scope.clinic_id.to_string());
        assert_eq!(row["created_by"], scope.user_id.to_string());
        assert_eq!(row["created_at"], row["updated_at"]);
        assert!(Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn booleans_read_back_as_json_bools() {
        let conn = test_db();
        let scope = seed_clinic(&conn, "North");
        let clinic = get_row(&conn, ResourceKind::Clinics, &scope, &scope.clinic_id)
            .unwrap()
            .unwrap();
        assert_eq!(clinic["aesthetics_enabled"], Value::Bool(false));
    }

    #[test]
    fn rows_are_invisible_across_clinics() {
        let conn = test_db();
        let north = seed_clinic(&conn, "North");
        let south = seed_clinic(&conn, "South");
        let row = insert_row(&conn, ResourceKind::Patients, &north, &patient_fields("Ana")).unwrap();
        let id = Uuid::parse_str(row["id"].as_str().unwrap()).unwrap();

        assert!(get_row(&conn, ResourceKind::Patients, &south, &id).unwrap().is_none());
        assert!(list_rows(&conn, ResourceKind::Patients, &south, &RowFilter::default())
            .unwrap()
            .is_empty());
        assert!(!delete_row(&conn, ResourceKind::Patients, &south, &id).unwrap());
        assert!(update_row(&conn, ResourceKind::Patients, &south, &id, &patient_fields("X"))
            .unwrap()
            .is_none());
        assert_eq!(
            list_rows(&conn, ResourceKind::Patients, &north, &RowFilter::default())
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn reference_to_other_clinic_patient_is_rejected() {
        let conn = test_db();
        let north = seed_clinic(&conn, "North");
        let south = seed_clinic(&conn, "South");
        let patient = insert_row(&conn, ResourceKind::Patients, &north, &patient_fields("Ana")).unwrap();

        let med = fields(json!({
            "patient_id": patient["id"], "name": "Metformin", "dose": null,
            "frequency": null, "route": null, "start_date": null, "end_date": null,
            "status": "active", "prescriber_id": null
        }));
        let err = insert_row(&conn, ResourceKind::Medications, &south, &med).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidReference { ref column, .. } if column == "patient_id"));
        assert!(insert_row(&conn, ResourceKind::Medications, &north, &med).is_ok());
    }

    #[test]
    fn list_filters_by_patient_and_orders_by_creation() {
        let conn = test_db();
        let scope = seed_clinic(&conn, "North");
        let a = insert_row(&conn, ResourceKind::Patients, &scope, &patient_fields("Ana")).unwrap();
        let b = insert_row(&conn, ResourceKind::Patients, &scope, &patient_fields("Ben")).unwrap();

        for (patient, test) in [(&a, "HbA1c"), (&b, "TSH"), (&a, "Lipids")] {
            let lab = fields(json!({
                "patient_id": patient["id"], "test_name": test, "collected_on": "2025-02-01",
                "value": 5.4, "value_text": null, "unit": "%", "reference_low": null,
                "reference_high": null, "flag": "normal", "ordered_by": null
            }));
            insert_row(&conn, ResourceKind::Labs, &scope, &lab).unwrap();
        }

        let filter = RowFilter {
            patient_id: Some(Uuid::parse_str(a["id"].as_str().unwrap()).unwrap()),
        };
        let labs = list_rows(&conn, ResourceKind::Labs, &scope, &filter).unwrap();
        let names: Vec<&str> = labs.iter().map(|r| r["test_name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["HbA1c", "Lipids"]);
        assert_eq!(labs[0]["value"], json!(5.4));
    }

    #[test]
    fn update_refreshes_updated_at_only() {
        let conn = test_db();
        let scope = seed_clinic(&conn, "North");
        let row = insert_row(&conn, ResourceKind::Patients, &scope, &patient_fields("Ana")).unwrap();
        let id = Uuid::parse_str(row["id"].as_str().unwrap()).unwrap();

        let updated = update_row(&conn, ResourceKind::Patients, &scope, &id, &patient_fields("Anna"))
            .unwrap()
            .unwrap();
        assert_eq!(updated["first_name"], "Anna");
        assert_eq!(updated["created_at"], row["created_at"]);
        assert!(updated["updated_at"].as_str() >= row["updated_at"].as_str());
    }

    #[test]
    fn type_mismatch_is_a_conversion_error() {
        let conn = test_db();
        let scope = seed_clinic(&conn, "North");
        let mut bad = patient_fields("Ana");
        bad.insert("first_name".into(), json!(42));
        let err = insert_row(&conn, ResourceKind::Patients, &scope, &bad).unwrap_err();
        assert!(matches!(err, DatabaseError::Conversion { .. }));
    }

    #[test]
    fn domain_fields_drop_system_columns() {
        let conn = test_db();
        let scope = seed_clinic(&conn, "North");
        let row = insert_row(&conn, ResourceKind::Patients, &scope, &patient_fields("Ana")).unwrap();
        let domain = domain_fields(ResourceKind::Patients, &row);
        assert!(!domain.contains_key("id"));
        assert!(!domain.contains_key("clinic_id"));
        assert_eq!(domain.len(), ResourceKind::Patients.columns().len());
    }
}
