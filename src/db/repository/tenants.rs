use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

use super::rows::{insert_row, Row, Scope};
use crate::db::DatabaseError;
use crate::resources::ResourceKind;

/// Ids of a freshly created organization, clinic and admin user.
#[derive(Debug, Clone, Copy)]
pub struct SeededTenant {
    pub organization_id: Uuid,
    pub clinic_id: Uuid,
    pub admin_id: Uuid,
}

impl SeededTenant {
    pub fn scope(&self) -> Scope {
        Scope {
            clinic_id: self.clinic_id,
            user_id: self.admin_id,
        }
    }
}

fn row_id(row: &Row) -> Result<Uuid, DatabaseError> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| DatabaseError::Conversion {
            column: "id".into(),
            reason: "inserted row has no id".into(),
        })
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Create an organization, one clinic and its first admin. Rows created
/// here carry the nil user as `created_by`.
pub fn create_tenant(
    conn: &Connection,
    organization_name: &str,
    clinic_name: &str,
    admin_email: &str,
    admin_name: &str,
) -> Result<SeededTenant, DatabaseError> {
    let system = Scope {
        clinic_id: Uuid::nil(),
        user_id: Uuid::nil(),
    };

    let org = insert_row(
        conn,
        ResourceKind::Organizations,
        &system,
        &object(json!({ "name": organization_name, "contact_email": null, "phone": null })),
    )?;
    let organization_id = row_id(&org)?;

    let clinic = insert_row(
        conn,
        ResourceKind::Clinics,
        &system,
        &object(json!({
            "organization_id": organization_id.to_string(),
            "name": clinic_name,
            "address": null,
            "timezone": null,
            "aesthetics_enabled": false
        })),
    )?;
    let clinic_id = row_id(&clinic)?;

    let admin = insert_row(
        conn,
        ResourceKind::Users,
        &Scope {
            clinic_id,
            user_id: Uuid::nil(),
        },
        &object(json!({
            "email": admin_email.trim().to_lowercase(),
            "full_name": admin_name,
            "role": "admin",
            "active": true
        })),
    )?;

    Ok(SeededTenant {
        organization_id,
        clinic_id,
        admin_id: row_id(&admin)?,
    })
}

pub fn count_users(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

/// First-run setup: seed a tenant and give its admin a password, but only
/// while the users table is empty.
pub fn bootstrap_admin(
    conn: &Connection,
    email: &str,
    password_hash: &str,
) -> Result<Option<SeededTenant>, DatabaseError> {
    if count_users(conn)? > 0 {
        return Ok(None);
    }
    let tx = conn.unchecked_transaction()?;
    let seeded = create_tenant(&tx, "Default Organization", "Default Clinic", email, "Administrator")?;
    super::auth::set_password_hash(&tx, &seeded.admin_id, password_hash)?;
    tx.commit()?;
    Ok(Some(seeded))
}

/// Whether the clinic has switched on the aesthetics module.
pub fn clinic_aesthetics_enabled(conn: &Connection, clinic_id: &Uuid) -> Result<bool, DatabaseError> {
    let enabled = conn
        .query_row(
            "SELECT aesthetics_enabled FROM clinics WHERE id = ?1",
            [clinic_id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "clinics".into(),
                id: clinic_id.to_string(),
            },
            other => DatabaseError::Sqlite(other),
        })?;
    Ok(enabled != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::test_db;
    use crate::db::{find_user_by_email, get_password_hash};

    #[test]
    fn bootstrap_runs_once() {
        let conn = test_db();
        let first = bootstrap_admin(&conn, "Root@Clinic.test", "hash").unwrap();
        assert!(first.is_some());
        assert!(bootstrap_admin(&conn, "other@clinic.test", "hash").unwrap().is_none());
        assert_eq!(count_users(&conn).unwrap(), 1);

        let account = find_user_by_email(&conn, "root@clinic.test").unwrap().unwrap();
        assert_eq!(account.role, crate::models::enums::UserRole::Admin);
        assert_eq!(get_password_hash(&conn, &account.id).unwrap().as_deref(), Some("hash"));
    }

    #[test]
    fn aesthetics_flag_defaults_off() {
        let conn = test_db();
        let seeded = create_tenant(&conn, "Org", "Clinic", "a@b.test", "A").unwrap();
        assert!(!clinic_aesthetics_enabled(&conn, &seeded.clinic_id).unwrap());
        conn.execute(
            "UPDATE clinics SET aesthetics_enabled = 1 WHERE id = ?1",
            [seeded.clinic_id.to_string()],
        )
        .unwrap();
        assert!(clinic_aesthetics_enabled(&conn, &seeded.clinic_id).unwrap());
    }

    #[test]
    fn unknown_clinic_is_not_found() {
        let conn = test_db();
        let err = clinic_aesthetics_enabled(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
