use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AuditSource, ReportStatus, ReportType};
use super::record::{require_not_blank, require_ordered, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub title: String,
    pub report_type: ReportType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub status: ReportStatus,
    /// JSON document produced by report generation.
    pub summary: Option<String>,
}

impl Record for ComplianceReport {
    const KIND: ResourceKind = ResourceKind::ComplianceReports;
    const COLUMNS: &'static [Column] = &[
        Column::text("title").required(),
        Column::text("report_type").required(),
        Column::date("period_start").required(),
        Column::date("period_end").required(),
        Column::text("status"),
        Column::text("summary"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("title", &self.title)?;
        require_ordered("period_end", Some(&self.period_start), Some(&self.period_end))
    }
}

/// One PHI access record. Written by the server middleware and by the
/// client's best-effort side channel; never edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub source: AuditSource,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub patient_id: Option<Uuid>,
    pub detail: Option<String>,
}

impl Record for AuditLog {
    const KIND: ResourceKind = ResourceKind::AuditLogs;
    const COLUMNS: &'static [Column] = &[
        Column::text("source").required(),
        Column::text("action").required(),
        Column::text("resource_type").required(),
        Column::text("resource_id"),
        Column::uuid("patient_id"),
        Column::text("detail"),
    ];

    // Server rows never come through this path.
    fn normalize(&mut self) {
        self.source = AuditSource::Client;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("action", &self.action)?;
        require_not_blank("resource_type", &self.resource_type)
    }
}
