//! Fixtures shared by the API, server and client tests.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::api::types::{generate_token, token_hash_hex};
use crate::core_state::CoreState;
use crate::db::{self, Scope};
use crate::resources::ResourceKind;

pub const TEST_API_KEY: &str = "test-api-key-0123456789";

pub fn test_core(dir: &tempfile::TempDir) -> Arc<CoreState> {
    Arc::new(CoreState::new(dir.path().join("clinic.db"), TEST_API_KEY, 12))
}

/// A seeded clinic with a signed-in admin and a signed-in staff member.
pub struct TestClinic {
    pub scope: Scope,
    pub admin_token: String,
    pub staff_id: Uuid,
    pub staff_token: String,
}

pub fn issue_token(core: &CoreState, user_id: &Uuid) -> String {
    let conn = core.open_db().unwrap();
    let token = generate_token();
    let expires = chrono::Utc::now() + chrono::Duration::hours(1);
    db::create_session(&conn, &token_hash_hex(&token), user_id, &expires).unwrap();
    token
}

pub fn seed_clinic(core: &CoreState, name: &str) -> TestClinic {
    let conn = core.open_db().unwrap();
    let seeded = db::create_tenant(
        &conn,
        &format!("{name} Org"),
        name,
        &format!("admin@{}.test", name.to_lowercase()),
        "Admin",
    )
    .unwrap();
    let scope = seeded.scope();

    let staff = json!({
        "email": format!("staff@{}.test", name.to_lowercase()),
        "full_name": "Front Desk",
        "role": "staff",
        "active": true
    });
    let staff = db::insert_row(&conn, ResourceKind::Users, &scope, staff.as_object().unwrap()).unwrap();
    let staff_id = Uuid::parse_str(staff["id"].as_str().unwrap()).unwrap();

    TestClinic {
        scope,
        admin_token: issue_token(core, &scope.user_id),
        staff_id,
        staff_token: issue_token(core, &staff_id),
    }
}

/// Switch the aesthetics module on for a clinic.
pub fn enable_aesthetics(core: &CoreState, clinic_id: &Uuid) {
    let conn = core.open_db().unwrap();
    conn.execute(
        "UPDATE clinics SET aesthetics_enabled = 1 WHERE id = ?1",
        [clinic_id.to_string()],
    )
    .unwrap();
}
