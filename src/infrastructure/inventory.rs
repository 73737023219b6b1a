//! Stock ledger.
//!
//! Stock can only be decremented through [`LockedVariants`], which is only
//! obtainable from [`lock_variants`]: the rows are read with `FOR UPDATE` in
//! ascending id order, so the sufficiency check and the decrement happen under
//! the same lock, and two transactions touching overlapping variants always
//! acquire their locks in the same order.

use std::collections::BTreeMap;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::schema::product_variants;

use super::models::VariantRow;

#[derive(Debug, Error)]
pub enum StockError {
    #[error("variant {variant_id} has {available} in stock, {requested} requested")]
    Insufficient {
        variant_id: Uuid,
        available: i32,
        requested: i32,
    },
    #[error("variant {0} does not exist")]
    UnknownVariant(Uuid),
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

/// Variant rows locked for the rest of the current transaction.
#[derive(Debug)]
pub struct LockedVariants {
    rows: BTreeMap<Uuid, VariantRow>,
}

/// Locks every variant in `ids`. Must be called inside a transaction; the
/// locks are released when it commits or rolls back.
pub fn lock_variants(conn: &mut PgConnection, ids: &[Uuid]) -> QueryResult<LockedVariants> {
    let rows = product_variants::table
        .filter(product_variants::id.eq_any(ids))
        .order(product_variants::id.asc())
        .select(VariantRow::as_select())
        .for_update()
        .load(conn)?;

    Ok(LockedVariants {
        rows: rows.into_iter().map(|row| (row.id, row)).collect(),
    })
}

impl LockedVariants {
    /// Conditional decrement: fails without writing if the locked stock
    /// cannot cover `quantity`.
    pub fn decrement(
        &mut self,
        conn: &mut PgConnection,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<(), StockError> {
        let row = self
            .rows
            .get_mut(&variant_id)
            .ok_or(StockError::UnknownVariant(variant_id))?;

        if row.stock < quantity {
            return Err(StockError::Insufficient {
                variant_id,
                available: row.stock,
                requested: quantity,
            });
        }

        diesel::update(product_variants::table.find(variant_id))
            .set(product_variants::stock.eq(product_variants::stock - quantity))
            .execute(conn)?;
        row.stock -= quantity;
        Ok(())
    }
}
