use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use super::rows::now_timestamp;
use crate::db::DatabaseError;
use crate::models::enums::UserRole;

/// The identity columns of a user, as the auth layer needs them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub active: bool,
}

fn parse_uuid(column: &str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::Conversion {
        column: column.into(),
        reason: e.to_string(),
    })
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

type AccountColumns = (String, String, String, String, String, i64);

const ACCOUNT_SELECT: &str = "SELECT u.id, u.clinic_id, u.email, u.full_name, u.role, u.active";

fn read_account_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountColumns> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn account_from_columns(cols: AccountColumns) -> Result<UserAccount, DatabaseError> {
    let (id, clinic_id, email, full_name, role, active) = cols;
    Ok(UserAccount {
        id: parse_uuid("id", &id)?,
        clinic_id: parse_uuid("clinic_id", &clinic_id)?,
        email,
        full_name,
        role: UserRole::from_str(&role)?,
        active: active != 0,
    })
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserAccount>, DatabaseError> {
    let cols = conn
        .query_row(
            &format!("{ACCOUNT_SELECT} FROM users u WHERE u.email = ?1"),
            [email.trim().to_lowercase()],
            read_account_columns,
        )
        .optional()?;
    cols.map(account_from_columns).transpose()
}

pub fn get_user_account(conn: &Connection, user_id: &Uuid) -> Result<Option<UserAccount>, DatabaseError> {
    let cols = conn
        .query_row(
            &format!("{ACCOUNT_SELECT} FROM users u WHERE u.id = ?1"),
            [user_id.to_string()],
            read_account_columns,
        )
        .optional()?;
    cols.map(account_from_columns).transpose()
}

/// Insert or replace the stored password hash for a user.
pub fn set_password_hash(conn: &Connection, user_id: &Uuid, hash: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO credentials (user_id, password_hash, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET password_hash = excluded.password_hash,
                                            updated_at = excluded.updated_at",
        params![user_id.to_string(), hash, now_timestamp()],
    )?;
    Ok(())
}

pub fn get_password_hash(conn: &Connection, user_id: &Uuid) -> Result<Option<String>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT password_hash FROM credentials WHERE user_id = ?1",
            [user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn create_session(
    conn: &Connection,
    token_hash: &str,
    user_id: &Uuid,
    expires_at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO auth_sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![token_hash, user_id.to_string(), now_timestamp(), timestamp(expires_at)],
    )?;
    Ok(())
}

/// Resolve a session token hash to its user. Expired sessions resolve
/// to `None`.
pub fn lookup_session(
    conn: &Connection,
    token_hash: &str,
    now: &DateTime<Utc>,
) -> Result<Option<UserAccount>, DatabaseError> {
    let cols = conn
        .query_row(
            &format!(
                "{ACCOUNT_SELECT} FROM auth_sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token_hash = ?1 AND s.expires_at > ?2"
            ),
            params![token_hash, timestamp(now)],
            read_account_columns,
        )
        .optional()?;
    cols.map(account_from_columns).transpose()
}

pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM auth_sessions WHERE token_hash = ?1", [token_hash])?;
    Ok(deleted > 0)
}

/// Revoke every session a user holds (used after a password change).
pub fn delete_sessions_for_user(conn: &Connection, user_id: &Uuid) -> Result<usize, DatabaseError> {
    Ok(conn.execute(
        "DELETE FROM auth_sessions WHERE user_id = ?1",
        [user_id.to_string()],
    )?)
}

pub fn prune_expired_sessions(conn: &Connection, now: &DateTime<Utc>) -> Result<usize, DatabaseError> {
    Ok(conn.execute(
        "DELETE FROM auth_sessions WHERE expires_at <= ?1",
        [timestamp(now)],
    )?)
}
