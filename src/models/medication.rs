use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MedicationStatus;
use super::record::{require_not_blank, require_ordered, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub patient_id: Uuid,
    pub name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: MedicationStatus,
    pub prescriber_id: Option<Uuid>,
}

impl Record for Medication {
    const KIND: ResourceKind = ResourceKind::Medications;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("patient_id").references(ResourceKind::Patients).required(),
        Column::text("name").required(),
        Column::text("dose"),
        Column::text("frequency"),
        Column::text("route"),
        Column::date("start_date"),
        Column::date("end_date"),
        Column::text("status"),
        Column::uuid("prescriber_id").references(ResourceKind::Users),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("name", &self.name)?;
        require_ordered("end_date", self.start_date.as_ref(), self.end_date.as_ref())
    }
}

/// Over-the-counter supplement the patient reports taking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplement {
    pub patient_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Record for Supplement {
    const KIND: ResourceKind = ResourceKind::Supplements;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("patient_id").references(ResourceKind::Patients).required(),
        Column::text("name").required(),
        Column::text("brand"),
        Column::text("dose"),
        Column::text("frequency"),
        Column::date("start_date"),
        Column::text("notes"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("name", &self.name)
    }
}
