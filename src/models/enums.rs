use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serde representation matches `as_str`, so stored text and JSON agree.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(UserRole {
    Admin => "admin",
    Provider => "provider",
    Staff => "staff",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    CheckedIn => "checked_in",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(LabFlag {
    Normal => "normal",
    Low => "low",
    High => "high",
    CriticalLow => "critical_low",
    CriticalHigh => "critical_high",
});

str_enum!(MedicationStatus {
    Active => "active",
    Paused => "paused",
    Stopped => "stopped",
});

str_enum!(PlanStatus {
    Draft => "draft",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(TimelineEventType {
    Visit => "visit",
    Diagnosis => "diagnosis",
    Procedure => "procedure",
    Lab => "lab",
    Medication => "medication",
    Note => "note",
    Other => "other",
});

str_enum!(NoteType {
    Progress => "progress",
    Soap => "soap",
    Consult => "consult",
    Procedure => "procedure",
});

str_enum!(MembershipStatus {
    Active => "active",
    Paused => "paused",
    Cancelled => "cancelled",
    Expired => "expired",
});

str_enum!(PaymentMethod {
    Card => "card",
    Cash => "cash",
    MembershipCredit => "membership_credit",
    Other => "other",
});

str_enum!(ReportType {
    PhiAccess => "phi_access",
    AuditSummary => "audit_summary",
    UserActivity => "user_activity",
});

str_enum!(ReportStatus {
    Draft => "draft",
    Final => "final",
});

str_enum!(AuditSource {
    Server => "server",
    Client => "client",
});

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl Default for LabFlag {
    fn default() -> Self {
        Self::Normal
    }
}

impl Default for MedicationStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl Default for PlanStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl Default for NoteType {
    fn default() -> Self {
        Self::Progress
    }
}

impl Default for MembershipStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl Default for ReportStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl LabFlag {
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CriticalLow | Self::CriticalHigh)
    }
}
