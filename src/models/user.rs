use serde::{Deserialize, Serialize};

use super::enums::UserRole;
use super::record::{require_not_blank, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

/// Clinic staff account. Credentials live in their own table and never
/// travel with the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Record for User {
    const KIND: ResourceKind = ResourceKind::Users;
    const COLUMNS: &'static [Column] = &[
        Column::text("email").required(),
        Column::text("full_name").required(),
        Column::text("role").required(),
        Column::boolean("active"),
    ];

    fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("full_name", &self.full_name)?;
        if !self.email.contains('@') {
            return Err(ValidationError::new("email", "must be an e-mail address"));
        }
        Ok(())
    }
}
