use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::TimelineEventType;
use super::record::{require_not_blank, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub patient_id: Uuid,
    pub event_type: TimelineEventType,
    pub title: String,
    pub occurred_on: NaiveDate,
    pub description: Option<String>,
}

impl Record for TimelineEvent {
    const KIND: ResourceKind = ResourceKind::TimelineEvents;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("patient_id").references(ResourceKind::Patients).required(),
        Column::text("event_type").required(),
        Column::text("title").required(),
        Column::date("occurred_on").required(),
        Column::text("description"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("title", &self.title)
    }
}
