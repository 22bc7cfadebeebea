use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem, CartTotals};
use crate::domain::coupon::Coupon;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderItem, StatusHistoryEntry};
use crate::domain::pricing::PriceBreakdown;
use crate::domain::product::{Product, ProductUpdate};
use crate::schema::{
    cart_items, carts, coupons, order_items, order_outbox, order_status_history, orders, products,
};

fn corrupt(what: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::Internal(format!("corrupt {what} row: {err}"))
}

// ── Products ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: BigDecimal,
    pub discount_percentage: i32,
    pub stock: i32,
    pub weight_grams: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DomainError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category.parse().map_err(|e| corrupt("product", e))?,
            price: row.price,
            discount_percentage: row.discount_percentage,
            stock: row.stock,
            weight_grams: row.weight_grams,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: BigDecimal,
    pub discount_percentage: i32,
    pub stock: i32,
    pub weight_grams: Option<i32>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChangeset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<BigDecimal>,
    pub discount_percentage: Option<i32>,
    pub weight_grams: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductUpdate> for ProductChangeset {
    fn from(update: ProductUpdate) -> Self {
        Self {
            name: update.name,
            description: update.description,
            category: update.category.map(|c| c.as_str().to_string()),
            price: update.price,
            discount_percentage: update.discount_percentage,
            weight_grams: update.weight_grams,
            updated_at: Utc::now(),
        }
    }
}

// ── Coupons ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub kind: String,
    pub amount: BigDecimal,
    pub min_purchase: BigDecimal,
    pub max_discount: Option<BigDecimal>,
    pub product_ids: Vec<Uuid>,
    pub categories: Vec<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DomainError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let categories = row
            .categories
            .iter()
            .map(|c| c.parse())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt("coupon", e))?;
        Ok(Coupon {
            id: row.id,
            code: row.code,
            kind: row.kind.parse().map_err(|e| corrupt("coupon", e))?,
            amount: row.amount,
            min_purchase: row.min_purchase,
            max_discount: row.max_discount,
            product_ids: row.product_ids,
            categories,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = coupons)]
pub struct NewCouponRow {
    pub id: Uuid,
    pub code: String,
    pub kind: String,
    pub amount: BigDecimal,
    pub min_purchase: BigDecimal,
    pub max_discount: Option<BigDecimal>,
    pub product_ids: Vec<Uuid>,
    pub categories: Vec<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Coupon> for NewCouponRow {
    fn from(c: &Coupon) -> Self {
        Self {
            id: c.id,
            code: c.code.clone(),
            kind: c.kind.as_str().to_string(),
            amount: c.amount.clone(),
            min_purchase: c.min_purchase.clone(),
            max_discount: c.max_discount.clone(),
            product_ids: c.product_ids.clone(),
            categories: c.categories.iter().map(|c| c.as_str().to_string()).collect(),
            starts_at: c.starts_at,
            ends_at: c.ends_at,
            usage_limit: c.usage_limit,
            used_count: c.used_count,
            active: c.active,
            created_at: c.created_at,
        }
    }
}

// ── Carts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub coupon_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub coupon_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(CartRow, foreign_key = cart_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub position: i32,
    pub quantity: i32,
    pub price: BigDecimal,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub position: i32,
    pub quantity: i32,
    pub price: BigDecimal,
    pub added_at: DateTime<Utc>,
}

impl CartRow {
    /// Items must already be ordered by position.
    pub fn into_cart(self, items: Vec<CartItemRow>) -> Cart {
        Cart {
            id: self.id,
            user_id: self.user_id,
            items: items
                .into_iter()
                .map(|i| CartItem {
                    id: i.id,
                    product_id: i.product_id,
                    quantity: i.quantity,
                    price: i.price,
                    added_at: i.added_at,
                })
                .collect(),
            coupon_id: self.coupon_id,
            coupon: None,
            totals: CartTotals::default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub shipping_method: String,
    pub shipping_address: Value,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub coupon_discount: BigDecimal,
    pub total_weight: i32,
    pub items_price: BigDecimal,
    pub shipping_price: BigDecimal,
    pub tax_price: BigDecimal,
    pub total_price: BigDecimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub shipping_method: String,
    pub shipping_address: Value,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub coupon_discount: BigDecimal,
    pub total_weight: i32,
    pub items_price: BigDecimal,
    pub shipping_price: BigDecimal,
    pub tax_price: BigDecimal,
    pub total_price: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewOrderRow {
    pub fn from_order(order: &Order) -> Result<Self, DomainError> {
        let shipping_address = serde_json::to_value(&order.shipping_address)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status.as_str().to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            shipping_method: order.shipping_method.as_str().to_string(),
            shipping_address,
            notes: order.notes.clone(),
            coupon_code: order.coupon_code.clone(),
            coupon_discount: order.coupon_discount.clone(),
            total_weight: order.total_weight,
            items_price: order.prices.items_price.clone(),
            shipping_price: order.prices.shipping_price.clone(),
            tax_price: order.prices.tax_price.clone(),
            total_price: order.prices.total_price.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount_percentage: i32,
    pub weight_grams: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount_percentage: i32,
    pub weight_grams: i32,
}

impl NewOrderItemRow {
    pub fn from_item(order_id: Uuid, position: i32, item: &OrderItem) -> Self {
        Self {
            id: item.id,
            order_id,
            position,
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.clone(),
            discount_percentage: item.discount_percentage,
            weight_grams: item.weight_grams,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_status_history)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusHistoryRow {
    pub id: i64,
    pub order_id: Uuid,
    pub status: String,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_status_history)]
pub struct NewStatusHistoryRow {
    pub order_id: Uuid,
    pub status: String,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewStatusHistoryRow {
    pub fn from_entry(order_id: Uuid, entry: &StatusHistoryEntry) -> Self {
        Self {
            order_id,
            status: entry.status.as_str().to_string(),
            actor_id: entry.actor_id,
            note: entry.note.clone(),
            created_at: entry.at,
        }
    }
}

impl OrderRow {
    /// Items ordered by position and history ordered by id.
    pub fn into_order(
        self,
        items: Vec<OrderItemRow>,
        history: Vec<StatusHistoryRow>,
    ) -> Result<Order, DomainError> {
        let history = history
            .into_iter()
            .map(|h| {
                Ok(StatusHistoryEntry {
                    status: h.status.parse().map_err(|e| corrupt("status history", e))?,
                    actor_id: h.actor_id,
                    note: h.note,
                    at: h.created_at,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            items: items
                .into_iter()
                .map(|i| OrderItem {
                    id: i.id,
                    product_id: i.product_id,
                    name: i.name,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    discount_percentage: i.discount_percentage,
                    weight_grams: i.weight_grams,
                })
                .collect(),
            shipping_address: serde_json::from_value(self.shipping_address)
                .map_err(|e| corrupt("order", e))?,
            payment_method: self.payment_method.parse().map_err(|e| corrupt("order", e))?,
            shipping_method: self.shipping_method.parse().map_err(|e| corrupt("order", e))?,
            notes: self.notes,
            coupon_code: self.coupon_code,
            coupon_discount: self.coupon_discount,
            total_weight: self.total_weight,
            prices: PriceBreakdown {
                items_price: self.items_price,
                shipping_price: self.shipping_price,
                tax_price: self.tax_price,
                total_price: self.total_price,
            },
            status: self.status.parse().map_err(|e| corrupt("order", e))?,
            payment_status: self.payment_status.parse().map_err(|e| corrupt("order", e))?,
            history,
            paid_at: self.paid_at,
            delivered_at: self.delivered_at,
            cancelled_at: self.cancelled_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}
