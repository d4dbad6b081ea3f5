use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::LabFlag;
use super::record::{require_not_blank, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lab {
    pub patient_id: Uuid,
    pub test_name: String,
    pub collected_on: NaiveDate,
    pub value: Option<f64>,
    pub value_text: Option<String>,
    pub unit: Option<String>,
    pub reference_low: Option<f64>,
    pub reference_high: Option<f64>,
    #[serde(default)]
    pub flag: LabFlag,
    pub ordered_by: Option<Uuid>,
}

impl Record for Lab {
    const KIND: ResourceKind = ResourceKind::Labs;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("patient_id").references(ResourceKind::Patients).required(),
        Column::text("test_name").required(),
        Column::date("collected_on").required(),
        Column::real("value"),
        Column::text("value_text"),
        Column::text("unit"),
        Column::real("reference_low"),
        Column::real("reference_high"),
        Column::text("flag"),
        Column::uuid("ordered_by").references(ResourceKind::Users),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("test_name", &self.test_name)?;
        if let (Some(low), Some(high)) = (self.reference_low, self.reference_high) {
            if low > high {
                return Err(ValidationError::new(
                    "reference_high",
                    "must not be below reference_low",
                ));
            }
        }
        if self.value.is_some_and(|v| !v.is_finite()) {
            return Err(ValidationError::new("value", "must be a finite number"));
        }
        Ok(())
    }
}
