use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::rows::{now_timestamp, Scope};
use crate::db::DatabaseError;

/// Move an item's stock by `delta`. Stock never goes negative: a sale
/// larger than the shelf fails with `ConstraintViolation` and changes
/// nothing.
pub fn adjust_stock(
    conn: &Connection,
    scope: &Scope,
    item_id: &Uuid,
    delta: i64,
) -> Result<(), DatabaseError> {
    let stock: Option<(i64, i64)> = conn
        .query_row(
            "SELECT quantity_on_hand, reorder_level FROM inventory_items
             WHERE id = ?1 AND clinic_id = ?2",
            params![item_id.to_string(), scope.clinic_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (on_hand, reorder_level) = stock.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "inventory_items".into(),
        id: item_id.to_string(),
    })?;

    let next = on_hand.checked_add(delta).filter(|q| *q >= 0).ok_or_else(|| {
        DatabaseError::ConstraintViolation(format!(
            "insufficient stock: {on_hand} on hand, {} requested",
            -delta
        ))
    })?;

    conn.execute(
        "UPDATE inventory_items SET quantity_on_hand = ?1, updated_at = ?2
         WHERE id = ?3 AND clinic_id = ?4",
        params![next, now_timestamp(), item_id.to_string(), scope.clinic_id.to_string()],
    )?;
    tracing::debug!(item = %item_id, delta, on_hand = next, "stock adjusted");
    if delta < 0 && next <= reorder_level {
        tracing::info!(item = %item_id, on_hand = next, reorder_level, "Item at reorder level");
    }
    Ok(())
}
