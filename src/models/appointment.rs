use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;
use super::record::{require_not_blank, require_positive, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentType {
    pub name: String,
    pub duration_minutes: i64,
    pub color: Option<String>,
    #[serde(default)]
    pub is_aesthetic: bool,
}

impl Record for AppointmentType {
    const KIND: ResourceKind = ResourceKind::AppointmentTypes;
    const COLUMNS: &'static [Column] = &[
        Column::text("name").required(),
        Column::integer("duration_minutes").required(),
        Column::text("color"),
        Column::boolean("is_aesthetic"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("name", &self.name)?;
        require_positive("duration_minutes", self.duration_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub patient_id: Uuid,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i64,
    pub provider_id: Option<Uuid>,
    pub appointment_type_id: Option<Uuid>,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl Record for Appointment {
    const KIND: ResourceKind = ResourceKind::Appointments;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("patient_id").references(ResourceKind::Patients).required(),
        Column::datetime("starts_at").required(),
        Column::integer("duration_minutes").required(),
        Column::uuid("provider_id").references(ResourceKind::Users),
        Column::uuid("appointment_type_id").references(ResourceKind::AppointmentTypes),
        Column::text("status"),
        Column::text("reason"),
        Column::text("notes"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_positive("duration_minutes", self.duration_minutes)
    }
}
