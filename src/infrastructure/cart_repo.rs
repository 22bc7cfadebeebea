use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::Cart;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Locks the cart row until the transaction ends and returns its
/// `(product_id, quantity)` lines in cart order, or `None` if it is gone.
pub(crate) fn lock_cart_lines(
    conn: &mut PgConnection,
    cart_id: Uuid,
) -> QueryResult<Option<Vec<(Uuid, i32)>>> {
    let locked = carts::table
        .filter(carts::id.eq(cart_id))
        .select(carts::id)
        .for_update()
        .first::<Uuid>(conn)
        .optional()?;
    if locked.is_none() {
        return Ok(None);
    }

    cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .order(cart_items::position.asc())
        .select((cart_items::product_id, cart_items::quantity))
        .load(conn)
        .map(Some)
}

/// Drops every line of `cart_id` and detaches its coupon.
pub(crate) fn clear_cart(conn: &mut PgConnection, cart_id: Uuid) -> QueryResult<()> {
    diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id))).execute(conn)?;
    diesel::update(carts::table.filter(carts::id.eq(cart_id)))
        .set((
            carts::coupon_id.eq(None::<Uuid>),
            carts::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(conn)?;
    Ok(())
}

impl CartRepository for DieselCartRepository {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, DomainError> {
        let mut conn = self.pool.get()?;

        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(cart) = cart else {
            return Ok(None);
        };

        let items = CartItemRow::belonging_to(&cart)
            .select(CartItemRow::as_select())
            .order(cart_items::position.asc())
            .load(&mut conn)?;

        Ok(Some(cart.into_cart(items)))
    }

    fn save(&self, cart: &Cart) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(carts::table)
                .values(&NewCartRow {
                    id: cart.id,
                    user_id: cart.user_id,
                    coupon_id: cart.coupon_id,
                    created_at: cart.created_at,
                    updated_at: cart.updated_at,
                })
                .on_conflict(carts::id)
                .do_update()
                .set((
                    carts::coupon_id.eq(cart.coupon_id),
                    carts::updated_at.eq(cart.updated_at),
                ))
                .execute(conn)?;

            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;

            let rows: Vec<NewCartItemRow> = cart
                .items
                .iter()
                .zip(0..)
                .map(|(item, position)| NewCartItemRow {
                    id: item.id,
                    cart_id: cart.id,
                    product_id: item.product_id,
                    position,
                    quantity: item.quantity,
                    price: item.price.clone(),
                    added_at: item.added_at,
                })
                .collect();
            if !rows.is_empty() {
                diesel::insert_into(cart_items::table)
                    .values(&rows)
                    .execute(conn)?;
            }

            Ok(())
        })
    }
}
