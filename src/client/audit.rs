//! Endpoints whose successful calls are mirrored into the audit log.

/// Endpoint name → audited resource type.
pub static AUDITED_ENDPOINTS: &[(&str, &str)] = &[
    ("get_patients", "patient"),
    ("create_patients", "patient"),
    ("update_patients", "patient"),
    ("delete_patients", "patient"),
    ("get_appointments", "appointment"),
    ("create_appointments", "appointment"),
    ("update_appointments", "appointment"),
    ("delete_appointments", "appointment"),
    ("get_labs", "lab"),
    ("create_labs", "lab"),
    ("update_labs", "lab"),
    ("delete_labs", "lab"),
    ("get_medications", "medication"),
    ("create_medications", "medication"),
    ("update_medications", "medication"),
    ("delete_medications", "medication"),
    ("get_supplements", "supplement"),
    ("create_supplements", "supplement"),
    ("update_supplements", "supplement"),
    ("delete_supplements", "supplement"),
    ("get_treatment_plans", "treatment_plan"),
    ("create_treatment_plans", "treatment_plan"),
    ("update_treatment_plans", "treatment_plan"),
    ("delete_treatment_plans", "treatment_plan"),
    ("get_timeline_events", "timeline_event"),
    ("create_timeline_events", "timeline_event"),
    ("update_timeline_events", "timeline_event"),
    ("delete_timeline_events", "timeline_event"),
    ("get_clinical_notes", "clinical_note"),
    ("create_clinical_notes", "clinical_note"),
    ("update_clinical_notes", "clinical_note"),
    ("delete_clinical_notes", "clinical_note"),
];

pub fn audited_resource_type(endpoint: &str) -> Option<&'static str> {
    AUDITED_ENDPOINTS
        .iter()
        .find(|(name, _)| *name == endpoint)
        .map(|(_, resource_type)| *resource_type)
}
