use std::collections::BTreeMap;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::{error, info};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Confirmation, IntentLookup, NewOrder, OrderLineView, OrderStatus, OrderView, PaymentProof,
    PaymentStatus,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_lines, orders};

use super::inventory::{self, StockError};
use super::models::{NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn to_view(order: OrderRow, lines: Vec<OrderLineRow>) -> Result<OrderView, DomainError> {
    Ok(OrderView {
        id: order.id,
        user_id: order.user_id,
        shipping_address: order.shipping_address,
        phone: order.phone,
        total_amount: order.total_amount,
        payment_status: order.payment_status.parse()?,
        order_status: order.order_status.parse().map_err(|_| {
            DomainError::Internal(format!(
                "Order {} has unknown status '{}'",
                order.id, order.order_status
            ))
        })?,
        remote_order_id: order.remote_order_id,
        remote_payment_id: order.remote_payment_id,
        created_at: order.created_at,
        lines: lines
            .into_iter()
            .map(|l| OrderLineView {
                id: l.id,
                variant_id: l.variant_id,
                product_name: l.product_name,
                variant_label: l.variant_label,
                unit_price: l.unit_price,
                quantity: l.quantity,
            })
            .collect(),
    })
}

fn load_lines(conn: &mut PgConnection, order_id: Uuid) -> QueryResult<Vec<OrderLineRow>> {
    order_lines::table
        .filter(order_lines::order_id.eq(order_id))
        .order(order_lines::created_at.asc())
        .select(OrderLineRow::as_select())
        .load(conn)
}

/// Order row matching `lookup`, locked `FOR UPDATE` until the transaction ends.
fn lock_order(conn: &mut PgConnection, lookup: &IntentLookup) -> QueryResult<Option<OrderRow>> {
    let by_intent = orders::remote_order_id.eq(lookup.remote_order_id.as_str());
    match lookup.owner {
        Some(owner) => orders::table
            .filter(by_intent)
            .filter(orders::user_id.eq(owner))
            .select(OrderRow::as_select())
            .for_update()
            .first(conn)
            .optional(),
        None => orders::table
            .filter(by_intent)
            .select(OrderRow::as_select())
            .for_update()
            .first(conn)
            .optional(),
    }
}

/// Inverse of `PricedLine::variant_label`.
fn size_from_label(label: &str) -> String {
    label.trim_start_matches("Size: ").to_string()
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id: order.user_id,
                    shipping_address: order.shipping_address.clone(),
                    phone: order.phone.clone(),
                    total_amount: order.total_amount.clone(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    order_status: OrderStatus::Processing.as_str().to_string(),
                })
                .execute(conn)?;

            // 2. Snapshot the priced lines
            let new_lines: Vec<NewOrderLineRow> = order
                .lines
                .iter()
                .map(|l| NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id,
                    variant_id: l.variant_id,
                    product_name: l.product_name.clone(),
                    variant_label: l.variant_label(),
                    unit_price: l.unit_price.clone(),
                    quantity: l.quantity,
                })
                .collect();
            diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .execute(conn)?;

            let row = orders::table
                .find(order_id)
                .select(OrderRow::as_select())
                .first(conn)?;
            let lines = load_lines(conn, order_id)?;
            to_view(row, lines)
        })
    }

    fn attach_remote_order(
        &self,
        order_id: Uuid,
        remote_order_id: &str,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(orders::table.find(order_id))
            .set((
                orders::remote_order_id.eq(remote_order_id),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(DomainError::not_found("Order"));
        }
        Ok(())
    }

    fn find_for_user(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .filter(orders::user_id.eq(user_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };
        let lines = load_lines(&mut conn, order.id)?;
        to_view(order, lines).map(Some)
    }

    fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };
        let lines = load_lines(&mut conn, order.id)?;
        to_view(order, lines).map(Some)
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = orders::table
            .filter(orders::user_id.eq(user_id))
            .order(orders::created_at.desc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;

        let lines = OrderLineRow::belonging_to(&rows)
            .order(order_lines::created_at.asc())
            .select(OrderLineRow::as_select())
            .load(&mut conn)?;

        lines
            .grouped_by(&rows)
            .into_iter()
            .zip(rows)
            .map(|(lines, order)| to_view(order, lines))
            .collect()
    }

    fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = orders::table
                .find(order_id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| DomainError::not_found("Order"))?;

            if order.payment_status != PaymentStatus::Paid.as_str() {
                return Err(DomainError::StatusConflict(
                    "Status can only be changed after payment is marked as Paid".to_string(),
                ));
            }

            let row = diesel::update(orders::table.find(order_id))
                .set((
                    orders::order_status.eq(status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            let lines = load_lines(conn, order_id)?;
            to_view(row, lines)
        })
    }

    fn confirm_payment(
        &self,
        lookup: &IntentLookup,
        proof: &PaymentProof,
    ) -> Result<Confirmation, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Lock the order row
            let order = lock_order(conn, lookup)?.ok_or_else(|| DomainError::not_found("Order"))?;

            // 2. Idempotency gate
            if order.payment_status == PaymentStatus::Paid.as_str() {
                return Ok(Confirmation::AlreadyPaid { order_id: order.id });
            }

            // 3. Lock every variant the order touches, ascending by id
            let lines = load_lines(conn, order.id)?;
            let mut wanted: BTreeMap<Uuid, i32> = BTreeMap::new();
            for line in &lines {
                // Saturating: an overflowing total can never be covered by stock.
                let total = wanted.entry(line.variant_id).or_default();
                *total = total.saturating_add(line.quantity);
            }
            let ids: Vec<Uuid> = wanted.keys().copied().collect();
            let mut locked = inventory::lock_variants(conn, &ids)?;

            // 4. Deduct; any shortfall rolls the whole transaction back
            for (variant_id, quantity) in &wanted {
                if let Err(e) = locked.decrement(conn, *variant_id, *quantity) {
                    let line = lines.iter().find(|l| l.variant_id == *variant_id);
                    return Err(match e {
                        StockError::Database(e) => e.into(),
                        e => {
                            error!(
                                "Fulfillment exception on order {} (remote {}): {}",
                                order.id, lookup.remote_order_id, e
                            );
                            let (product, size) = line
                                .map(|l| {
                                    (l.product_name.clone(), size_from_label(&l.variant_label))
                                })
                                .unwrap_or_default();
                            DomainError::FulfillmentException {
                                order_id: order.id,
                                product,
                                size,
                            }
                        }
                    });
                }
            }

            // 5. Mark paid
            diesel::update(orders::table.find(order.id))
                .set((
                    orders::payment_status.eq(PaymentStatus::Paid.as_str()),
                    orders::order_status.eq(OrderStatus::Paid.as_str()),
                    orders::remote_payment_id.eq(proof.remote_payment_id.as_str()),
                    orders::remote_signature.eq(proof.signature.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            info!(
                "Order {} paid via {}; stock deducted for {} variant(s)",
                order.id,
                proof.remote_payment_id,
                wanted.len()
            );
            Ok(Confirmation::Applied { order_id: order.id })
        })
    }
}
