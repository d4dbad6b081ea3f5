use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{AuditSource, ReportType};
use crate::resources::ResourceKind;

/// One audit trail entry, written in batches by the audit logger.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub clinic_id: Uuid,
    pub user_id: Uuid,
    pub source: AuditSource,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub patient_id: Option<Uuid>,
    pub detail: Option<String>,
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Insert a batch of audit entries into the audit_logs table.
pub fn insert_audit_entries(conn: &Connection, entries: &[AuditEntry]) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO audit_logs (id, clinic_id, created_by, created_at, updated_at,
                                 source, action, resource_type, resource_id, patient_id, detail)
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for entry in entries {
        stmt.execute(params![
            Uuid::new_v4().to_string(),
            entry.clinic_id.to_string(),
            entry.user_id.to_string(),
            timestamp(&entry.at),
            entry.source.as_str(),
            entry.action,
            entry.resource_type,
            entry.resource_id,
            entry.patient_id.map(|p| p.to_string()),
            entry.detail,
        ])?;
    }
    Ok(())
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let cutoff = Utc::now() - Duration::days(retention_days);
    let deleted = conn.execute(
        "DELETE FROM audit_logs WHERE created_at < ?1",
        params![timestamp(&cutoff)],
    )?;
    Ok(deleted)
}

/// Aggregate stored in a compliance report's `summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub report_type: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total: i64,
    pub by_resource_type: BTreeMap<String, i64>,
    pub by_action: BTreeMap<String, i64>,
    pub by_source: BTreeMap<String, i64>,
    pub by_user: BTreeMap<String, i64>,
    pub distinct_patients: i64,
}

/// Resource types that count as PHI access.
fn phi_resource_types() -> BTreeSet<&'static str> {
    ResourceKind::ALL
        .iter()
        .filter_map(|k| k.audit_resource_type())
        .collect()
}

/// Summarize a clinic's audit entries between two dates, both inclusive.
/// `phi_access` reports count PHI resource types only.
pub fn summarize_audit(
    conn: &Connection,
    clinic_id: &Uuid,
    report_type: ReportType,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<AuditSummary, DatabaseError> {
    let lower = format!("{}T00:00:00", period_start.format("%Y-%m-%d"));
    let upper = period_end
        .succ_opt()
        .map(|d| format!("{}T00:00:00", d.format("%Y-%m-%d")))
        .unwrap_or_else(|| "9999-12-31T23:59:59".into());

    let mut stmt = conn.prepare(
        "SELECT source, action, resource_type, patient_id, created_by FROM audit_logs
         WHERE clinic_id = ?1 AND created_at >= ?2 AND created_at < ?3",
    )?;
    let rows = stmt
        .query_map(params![clinic_id.to_string(), lower, upper], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let phi = phi_resource_types();
    let mut summary = AuditSummary {
        report_type: report_type.as_str().to_string(),
        period_start,
        period_end,
        ..AuditSummary::default()
    };
    let mut patients = BTreeSet::new();

    for (source, action, resource_type, patient_id, user) in rows {
        if report_type == ReportType::PhiAccess && !phi.contains(resource_type.as_str()) {
            continue;
        }
        summary.total += 1;
        *summary.by_resource_type.entry(resource_type).or_default() += 1;
        *summary.by_action.entry(action).or_default() += 1;
        *summary.by_source.entry(source).or_default() += 1;
        if let Some(user) = user {
            *summary.by_user.entry(user).or_default() += 1;
        }
        if let Some(patient) = patient_id {
            patients.insert(patient);
        }
    }
    summary.distinct_patients = patients.len() as i64;
    Ok(summary)
}
