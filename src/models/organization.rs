use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{require_not_blank, Record, ValidationError};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
}

impl Record for Organization {
    const KIND: ResourceKind = ResourceKind::Organizations;
    const COLUMNS: &'static [Column] = &[
        Column::text("name").required(),
        Column::text("contact_email"),
        Column::text("phone"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("name", &self.name)
    }
}

/// A clinic is the tenant boundary: clinic-scoped rows carry its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub organization_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub aesthetics_enabled: bool,
}

impl Record for Clinic {
    const KIND: ResourceKind = ResourceKind::Clinics;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("organization_id").references(ResourceKind::Organizations).required(),
        Column::text("name").required(),
        Column::text("address"),
        Column::text("timezone"),
        Column::boolean("aesthetics_enabled"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("name", &self.name)
    }
}
