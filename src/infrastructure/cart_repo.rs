use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{CartLine, CartView};
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts, product_variants, products};

use super::catalog_repo::variant_snapshot;
use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow, ProductRow, VariantRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn find_cart_row(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Option<CartRow>> {
    carts::table
        .filter(carts::user_id.eq(user_id))
        .select(CartRow::as_select())
        .first(conn)
        .optional()
}

fn ensure_cart_row(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<CartRow> {
    // One cart per user; a concurrent insert simply loses the race.
    diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            user_id,
        })
        .on_conflict(carts::user_id)
        .do_nothing()
        .execute(conn)?;

    carts::table
        .filter(carts::user_id.eq(user_id))
        .select(CartRow::as_select())
        .first(conn)
}

fn load_cart(conn: &mut PgConnection, cart: CartRow) -> QueryResult<CartView> {
    let rows = cart_items::table
        .inner_join(product_variants::table.inner_join(products::table))
        .filter(cart_items::cart_id.eq(cart.id))
        .order((cart_items::created_at.asc(), cart_items::id.asc()))
        .select((
            CartItemRow::as_select(),
            VariantRow::as_select(),
            ProductRow::as_select(),
        ))
        .load::<(CartItemRow, VariantRow, ProductRow)>(conn)?;

    Ok(CartView {
        cart_id: cart.id,
        items: rows
            .into_iter()
            .map(|(item, variant, product)| CartLine {
                item_id: item.id,
                quantity: item.quantity,
                variant: variant_snapshot(variant, product),
            })
            .collect(),
    })
}

impl CartRepository for DieselCartRepository {
    fn find_cart(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(cart) = find_cart_row(&mut conn, user_id)? else {
            return Ok(None);
        };
        Ok(Some(load_cart(&mut conn, cart)?))
    }

    fn get_or_create_cart(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        let cart = ensure_cart_row(&mut conn, user_id)?;
        Ok(load_cart(&mut conn, cart)?)
    }

    fn add_item(
        &self,
        user_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = ensure_cart_row(conn, user_id)?;

            diesel::insert_into(cart_items::table)
                .values(&NewCartItemRow {
                    id: Uuid::new_v4(),
                    cart_id: cart.id,
                    variant_id,
                    quantity,
                })
                .on_conflict((cart_items::cart_id, cart_items::variant_id))
                .do_update()
                .set(cart_items::quantity.eq(cart_items::quantity + quantity))
                .execute(conn)?;

            diesel::update(carts::table.find(cart.id))
                .set(carts::updated_at.eq(Utc::now()))
                .execute(conn)?;

            Ok(load_cart(conn, cart)?)
        })
    }

    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(cart) = find_cart_row(&mut conn, user_id)? else {
            return Err(DomainError::not_found("Cart item"));
        };

        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::id.eq(item_id))
                .filter(cart_items::cart_id.eq(cart.id)),
        )
        .execute(&mut conn)?;

        if deleted == 0 {
            return Err(DomainError::not_found("Cart item"));
        }
        Ok(load_cart(&mut conn, cart)?)
    }

    fn clear_cart(&self, user_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let user_carts = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(carts::id);
        diesel::delete(cart_items::table.filter(cart_items::cart_id.eq_any(user_carts)))
            .execute(&mut conn)?;
        Ok(())
    }
}
