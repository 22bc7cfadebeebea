use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

use super::cart::Cart;
use super::coupon::{Coupon, NewCoupon};
use super::errors::DomainError;
use super::notification::Notification;
use super::order::{Order, Transition};
use super::product::{Category, NewProduct, Page, PageRequest, Product, ProductUpdate};

pub trait ProductRepository: Send + Sync + 'static {
    fn create(&self, product: NewProduct) -> Result<Product, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError>;
    fn list(&self, page: PageRequest, category: Option<Category>)
        -> Result<Page<Product>, DomainError>;
    fn update(&self, id: Uuid, update: ProductUpdate) -> Result<Option<Product>, DomainError>;
    /// Atomically applies `stock += delta`, refusing to go below zero.
    fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Product, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, DomainError>;
    /// Persists the cart row, its coupon reference and the full item list.
    fn save(&self, cart: &Cart) -> Result<(), DomainError>;
}

pub trait CouponRepository: Send + Sync + 'static {
    fn create(&self, coupon: NewCoupon) -> Result<Coupon, DomainError>;
    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, DomainError>;
    fn list(&self) -> Result<Vec<Coupon>, DomainError>;
}

/// Everything checkout commits in a single transaction.
#[derive(Debug, Clone)]
pub struct OrderPlacement {
    pub order: Order,
    pub cart_id: Uuid,
    /// `(product_id, quantity)` per cart line, in cart order, as priced.
    /// The cart must still hold exactly these lines when the order commits.
    pub cart_lines: Vec<(Uuid, i32)>,
    /// Coupon whose usage counter is consumed by this order.
    pub coupon_id: Option<Uuid>,
}

impl OrderPlacement {
    pub fn new(order: Order, cart: &Cart, coupon_id: Option<Uuid>) -> Self {
        Self {
            order,
            cart_id: cart.id,
            cart_lines: cart
                .items
                .iter()
                .map(|item| (item.product_id, item.quantity))
                .collect(),
            coupon_id,
        }
    }
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Inserts the order, reserves stock for every item, consumes the coupon
    /// and clears the cart, all or nothing. Fails with `InvalidState` when the
    /// cart no longer holds `cart_lines`, so a repeated submission places nothing.
    fn place(&self, placement: &OrderPlacement) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list(&self, user_id: Option<Uuid>, page: PageRequest) -> Result<Page<Order>, DomainError>;
    /// Persists `order` (already transitioned) if it is still in `transition.from`,
    /// restocking items when the transition asks for it.
    fn save_transition(&self, order: &Order, transition: &Transition) -> Result<(), DomainError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum SideEffectError {
    #[error("cache error: {0}")]
    Cache(String),
    #[error("notification error: {0}")]
    Notification(String),
}

pub trait CacheProvider: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, SideEffectError>;
    /// Stores `value` read from its source at `read_at`, unless `key` has been
    /// invalidated since; a slow read must not put back what a write replaced.
    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        read_at: Instant,
    ) -> Result<(), SideEffectError>;
    fn invalidate(&self, key: &str) -> Result<(), SideEffectError>;
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: &Notification) -> Result<(), SideEffectError>;
}
