use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::NoteType;
use super::record::{require_not_blank, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub patient_id: Uuid,
    pub body: String,
    #[serde(default)]
    pub note_type: NoteType,
    pub title: Option<String>,
    pub appointment_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub signed: bool,
}

impl Record for ClinicalNote {
    const KIND: ResourceKind = ResourceKind::ClinicalNotes;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("patient_id").references(ResourceKind::Patients).required(),
        Column::text("body").required(),
        Column::text("note_type"),
        Column::text("title"),
        Column::uuid("appointment_id").references(ResourceKind::Appointments),
        Column::uuid("author_id").references(ResourceKind::Users),
        Column::boolean("signed"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("body", &self.body)
    }
}
