use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PlanStatus;
use super::record::{require_not_blank, require_ordered, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub patient_id: Uuid,
    pub title: String,
    pub goals: Option<String>,
    pub details: Option<String>,
    #[serde(default)]
    pub status: PlanStatus,
    pub start_date: Option<NaiveDate>,
    pub review_date: Option<NaiveDate>,
    pub provider_id: Option<Uuid>,
}

impl Record for TreatmentPlan {
    const KIND: ResourceKind = ResourceKind::TreatmentPlans;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("patient_id").references(ResourceKind::Patients).required(),
        Column::text("title").required(),
        Column::text("goals"),
        Column::text("details"),
        Column::text("status"),
        Column::date("start_date"),
        Column::date("review_date"),
        Column::uuid("provider_id").references(ResourceKind::Users),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("title", &self.title)?;
        require_ordered("review_date", self.start_date.as_ref(), self.review_date.as_ref())
    }
}
