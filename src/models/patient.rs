use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{require_not_blank, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Medical record number assigned by the clinic.
    pub mrn: Option<String>,
    pub notes: Option<String>,
}

impl Record for Patient {
    const KIND: ResourceKind = ResourceKind::Patients;
    const COLUMNS: &'static [Column] = &[
        Column::text("first_name").required(),
        Column::text("last_name").required(),
        Column::date("date_of_birth"),
        Column::text("sex"),
        Column::text("email"),
        Column::text("phone"),
        Column::text("address"),
        Column::text("mrn"),
        Column::text("notes"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("first_name", &self.first_name)?;
        require_not_blank("last_name", &self.last_name)?;
        if let Some(dob) = self.date_of_birth {
            if dob > chrono::Utc::now().date_naive() {
                return Err(ValidationError::new("date_of_birth", "must not be in the future"));
            }
        }
        Ok(())
    }
}
