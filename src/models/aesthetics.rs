//! Aesthetics module records: memberships, retail inventory, and
//! point-of-sale transactions. All three are gated by the clinic's
//! `aesthetics_enabled` flag.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MembershipStatus, PaymentMethod};
use super::record::{
    require_non_negative, require_not_blank, require_ordered, require_positive, Record,
    ValidationError,
};
use crate::db::{self, DatabaseError, Scope};
use crate::resources::{Column, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub patient_id: Uuid,
    pub plan_name: String,
    pub monthly_fee_cents: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: MembershipStatus,
}

impl Record for Membership {
    const KIND: ResourceKind = ResourceKind::Memberships;
    const COLUMNS: &'static [Column] = &[
        Column::uuid("patient_id").references(ResourceKind::Patients).required(),
        Column::text("plan_name").required(),
        Column::integer("monthly_fee_cents").required(),
        Column::date("start_date").required(),
        Column::date("end_date"),
        Column::text("status"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("plan_name", &self.plan_name)?;
        require_non_negative("monthly_fee_cents", self.monthly_fee_cents)?;
        require_ordered("end_date", Some(&self.start_date), self.end_date.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub quantity_on_hand: i64,
    #[serde(default)]
    pub reorder_level: i64,
}

impl Record for InventoryItem {
    const KIND: ResourceKind = ResourceKind::InventoryItems;
    const COLUMNS: &'static [Column] = &[
        Column::text("sku").required(),
        Column::text("name").required(),
        Column::integer("unit_price_cents").required(),
        Column::integer("quantity_on_hand"),
        Column::integer("reorder_level"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("sku", &self.sku)?;
        require_not_blank("name", &self.name)?;
        require_non_negative("unit_price_cents", self.unit_price_cents)?;
        require_non_negative("quantity_on_hand", self.quantity_on_hand)?;
        require_non_negative("reorder_level", self.reorder_level)
    }
}

/// A point-of-sale line. `total_cents` is always recomputed server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosTransaction {
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub payment_method: PaymentMethod,
    pub patient_id: Option<Uuid>,
    pub inventory_item_id: Option<Uuid>,
    #[serde(default)]
    pub total_cents: i64,
    pub performed_at: Option<NaiveDateTime>,
}

impl Record for PosTransaction {
    const KIND: ResourceKind = ResourceKind::PosTransactions;
    const COLUMNS: &'static [Column] = &[
        Column::text("description").required(),
        Column::integer("quantity").required(),
        Column::integer("unit_price_cents").required(),
        Column::text("payment_method").required(),
        Column::uuid("patient_id").references(ResourceKind::Patients),
        Column::uuid("inventory_item_id").references(ResourceKind::InventoryItems),
        Column::integer("total_cents"),
        Column::datetime("performed_at"),
    ];

    fn normalize(&mut self) {
        self.total_cents = self.quantity.saturating_mul(self.unit_price_cents);
        if self.performed_at.is_none() {
            self.performed_at = Some(chrono::Utc::now().naive_utc());
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("description", &self.description)?;
        require_positive("quantity", self.quantity)?;
        require_non_negative("unit_price_cents", self.unit_price_cents)
    }

    fn on_insert(&self, conn: &Connection, scope: &Scope) -> Result<(), DatabaseError> {
        match self.inventory_item_id {
            Some(item_id) => db::adjust_stock(conn, scope, &item_id, -self.quantity),
            None => Ok(()),
        }
    }

    /// Voiding a sale puts the units back on the shelf, unless the item
    /// itself has since been deleted.
    fn on_delete(&self, conn: &Connection, scope: &Scope) -> Result<(), DatabaseError> {
        let Some(item_id) = self.inventory_item_id else {
            return Ok(());
        };
        match db::adjust_stock(conn, scope, &item_id, self.quantity) {
            Err(DatabaseError::NotFound { .. }) => {
                tracing::debug!(item = %item_id, "Restock skipped; item no longer exists");
                Ok(())
            }
            other => other,
        }
    }
}
