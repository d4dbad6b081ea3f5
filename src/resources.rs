//! Resource catalog shared by the REST handlers and the client.
//!
//! Every record type is a flat table exposed under `/api/<slug>`. The slug
//! doubles as the table name and as the named array field in list
//! responses. Endpoint names follow `<op>_<slug>` (`get_patients`,
//! `create_appointments`, `update_labs`, ...).

use serde_json::{Map, Value};

use crate::models::{
    Appointment, AppointmentType, AuditLog, Clinic, ClinicalNote, ComplianceReport,
    InventoryItem, Lab, Medication, Membership, Organization, Patient, PosTransaction, Record,
    Supplement, TimelineEvent, TreatmentPlan, User,
};

/// Storage type of a domain column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Uuid,
    Date,
    DateTime,
    Integer,
    Real,
    Bool,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Text | Self::Uuid | Self::Date | Self::DateTime => "TEXT",
            Self::Integer | Self::Bool => "INTEGER",
            Self::Real => "REAL",
        }
    }
}

/// A client-settable column of a resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub required: bool,
    /// Resource whose row this id must name, inside the caller's scope.
    pub references: Option<ResourceKind>,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            required: false,
            references: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub const fn uuid(name: &'static str) -> Self {
        Self::new(name, ColumnType::Uuid)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, ColumnType::Date)
    }

    pub const fn datetime(name: &'static str) -> Self {
        Self::new(name, ColumnType::DateTime)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, ColumnType::Real)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, ColumnType::Bool)
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn references(self, kind: ResourceKind) -> Self {
        Self {
            references: Some(kind),
            ..self
        }
    }
}

/// Columns maintained by the server on every table.
pub const SYSTEM_COLUMNS: &[&str] = &["id", "clinic_id", "created_by", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tenancy {
    /// Shared across clinics (organizations, clinics).
    Global,
    /// Rows carry `clinic_id` and are only visible inside that clinic.
    Clinic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    Any,
    AdminOnly,
    /// Create only. Update and delete are refused.
    AppendOnly,
    /// Create and delete (void). Update is refused.
    CreateDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    Any,
    AdminOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Organizations,
    Clinics,
    Users,
    Patients,
    AppointmentTypes,
    Appointments,
    Labs,
    Medications,
    Supplements,
    TreatmentPlans,
    TimelineEvents,
    ClinicalNotes,
    Memberships,
    InventoryItems,
    PosTransactions,
    ComplianceReports,
    AuditLogs,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 17] = [
        Self::Organizations,
        Self::Clinics,
        Self::Users,
        Self::Patients,
        Self::AppointmentTypes,
        Self::Appointments,
        Self::Labs,
        Self::Medications,
        Self::Supplements,
        Self::TreatmentPlans,
        Self::TimelineEvents,
        Self::ClinicalNotes,
        Self::Memberships,
        Self::InventoryItems,
        Self::PosTransactions,
        Self::ComplianceReports,
        Self::AuditLogs,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Clinics => "clinics",
            Self::Users => "users",
            Self::Patients => "patients",
            Self::AppointmentTypes => "appointment_types",
            Self::Appointments => "appointments",
            Self::Labs => "labs",
            Self::Medications => "medications",
            Self::Supplements => "supplements",
            Self::TreatmentPlans => "treatment_plans",
            Self::TimelineEvents => "timeline_events",
            Self::ClinicalNotes => "clinical_notes",
            Self::Memberships => "memberships",
            Self::InventoryItems => "inventory_items",
            Self::PosTransactions => "pos_transactions",
            Self::ComplianceReports => "compliance_reports",
            Self::AuditLogs => "audit_logs",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }

    /// SQL table name. Identical to the slug.
    pub fn table(self) -> &'static str {
        self.slug()
    }

    /// Named array field in list responses.
    pub fn list_field(self) -> &'static str {
        self.slug()
    }

    pub fn tenancy(self) -> Tenancy {
        match self {
            Self::Organizations | Self::Clinics => Tenancy::Global,
            _ => Tenancy::Clinic,
        }
    }

    pub fn write_policy(self) -> WritePolicy {
        match self {
            Self::Organizations
            | Self::Clinics
            | Self::Users
            | Self::AppointmentTypes
            | Self::ComplianceReports => WritePolicy::AdminOnly,
            Self::AuditLogs => WritePolicy::AppendOnly,
            Self::PosTransactions => WritePolicy::CreateDelete,
            _ => WritePolicy::Any,
        }
    }

    pub fn read_policy(self) -> ReadPolicy {
        match self {
            Self::ComplianceReports | Self::AuditLogs => ReadPolicy::AdminOnly,
            _ => ReadPolicy::Any,
        }
    }

    /// Whether rows carry a `patient_id` that lists can filter on.
    pub fn is_patient_scoped(self) -> bool {
        matches!(
            self,
            Self::Appointments
                | Self::Labs
                | Self::Medications
                | Self::Supplements
                | Self::TreatmentPlans
                | Self::TimelineEvents
                | Self::ClinicalNotes
                | Self::Memberships
                | Self::PosTransactions
                | Self::AuditLogs
        )
    }

    /// Aesthetics module resources, gated by the clinic feature flag.
    pub fn requires_aesthetics(self) -> bool {
        matches!(
            self,
            Self::Memberships | Self::InventoryItems | Self::PosTransactions
        )
    }

    /// Resource type recorded in the audit log when PHI is touched.
    pub fn audit_resource_type(self) -> Option<&'static str> {
        match self {
            Self::Patients => Some("patient"),
            Self::Appointments => Some("appointment"),
            Self::Labs => Some("lab"),
            Self::Medications => Some("medication"),
            Self::Supplements => Some("supplement"),
            Self::TreatmentPlans => Some("treatment_plan"),
            Self::TimelineEvents => Some("timeline_event"),
            Self::ClinicalNotes => Some("clinical_note"),
            _ => None,
        }
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            Self::Organizations => Organization::COLUMNS,
            Self::Clinics => Clinic::COLUMNS,
            Self::Users => User::COLUMNS,
            Self::Patients => Patient::COLUMNS,
            Self::AppointmentTypes => AppointmentType::COLUMNS,
            Self::Appointments => Appointment::COLUMNS,
            Self::Labs => Lab::COLUMNS,
            Self::Medications => Medication::COLUMNS,
            Self::Supplements => Supplement::COLUMNS,
            Self::TreatmentPlans => TreatmentPlan::COLUMNS,
            Self::TimelineEvents => TimelineEvent::COLUMNS,
            Self::ClinicalNotes => ClinicalNote::COLUMNS,
            Self::Memberships => Membership::COLUMNS,
            Self::InventoryItems => InventoryItem::COLUMNS,
            Self::PosTransactions => PosTransaction::COLUMNS,
            Self::ComplianceReports => ComplianceReport::COLUMNS,
            Self::AuditLogs => AuditLog::COLUMNS,
        }
    }

    pub fn column(self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.name == name)
    }

    pub fn required_fields(self) -> impl Iterator<Item = &'static str> {
        self.columns().iter().filter(|c| c.required).map(|c| c.name)
    }

    /// Columns a list view shows (and searches) by default.
    pub fn display_columns(self) -> &'static [&'static str] {
        match self {
            Self::Organizations => &["name", "contact_email"],
            Self::Clinics => &["name", "address"],
            Self::Users => &["full_name", "email", "role"],
            Self::Patients => &["first_name", "last_name", "mrn", "email", "phone"],
            Self::AppointmentTypes => &["name", "duration_minutes"],
            Self::Appointments => &["starts_at", "status", "reason"],
            Self::Labs => &["test_name", "value", "unit", "flag", "collected_on"],
            Self::Medications => &["name", "dose", "frequency", "status"],
            Self::Supplements => &["name", "brand", "dose"],
            Self::TreatmentPlans => &["title", "status", "start_date"],
            Self::TimelineEvents => &["title", "event_type", "occurred_on"],
            Self::ClinicalNotes => &["title", "note_type", "body"],
            Self::Memberships => &["plan_name", "status", "start_date"],
            Self::InventoryItems => &["sku", "name", "quantity_on_hand"],
            Self::PosTransactions => &["description", "total_cents", "payment_method"],
            Self::ComplianceReports => &["title", "report_type", "status"],
            Self::AuditLogs => &["action", "resource_type", "source"],
        }
    }
}

/// Required fields that are absent, null, or blank strings.
pub fn missing_required(kind: ResourceKind, fields: &Map<String, Value>) -> Vec<&'static str> {
    kind.required_fields()
        .filter(|name| match fields.get(*name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════
// Endpoint names
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointOp {
    Get,
    Create,
    Update,
    Delete,
}

impl EndpointOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Verb recorded in audit entries.
    pub fn audit_action(self) -> &'static str {
        match self {
            Self::Get => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

pub fn endpoint_name(op: EndpointOp, kind: ResourceKind) -> String {
    format!("{}_{}", op.as_str(), kind.slug())
}

/// Split `get_patients` into its operation and resource.
pub fn parse_endpoint_name(name: &str) -> Option<(EndpointOp, ResourceKind)> {
    let (op, slug) = name.split_once('_')?;
    let op = match op {
        "get" => EndpointOp::Get,
        "create" => EndpointOp::Create,
        "update" => EndpointOp::Update,
        "delete" => EndpointOp::Delete,
        _ => return None,
    };
    Some((op, ResourceKind::from_slug(slug)?))
}
