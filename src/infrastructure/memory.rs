//! In-process implementation of every repository port.
//!
//! A single mutex guards the whole state, so each call is trivially atomic;
//! multi-entity writes stage their changes on copies and swap them in only
//! when every step succeeded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartTotals};
use crate::domain::coupon::{normalize_code, Coupon, NewCoupon};
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, Transition};
use crate::domain::ports::{
    CartRepository, CouponRepository, OrderPlacement, OrderRepository, ProductRepository,
};
use crate::domain::product::{Category, NewProduct, Page, PageRequest, Product, ProductUpdate};

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    coupons: HashMap<Uuid, Coupon>,
    carts: HashMap<Uuid, Cart>,
    orders: HashMap<Uuid, Order>,
    outbox: Vec<(String, Uuid)>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("in-memory store lock poisoned".to_string()))
    }

    /// Event types written to the outbox for `order_id`, oldest first.
    pub fn outbox_events(&self, order_id: Uuid) -> Vec<String> {
        self.lock()
            .map(|s| {
                s.outbox
                    .iter()
                    .filter(|(_, id)| *id == order_id)
                    .map(|(event, _)| event.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Inserts a coupon as-is, bypassing creation rules.
    pub fn insert_coupon(&self, coupon: Coupon) -> Result<(), DomainError> {
        self.lock()?.coupons.insert(coupon.id, coupon);
        Ok(())
    }
}

/// Applies `stock += delta` unless the result would be negative.
///
/// Returns the new stock, or `None` when the product is missing or the
/// guard rejected the change.
fn apply_stock_delta(
    products: &mut HashMap<Uuid, Product>,
    product_id: Uuid,
    delta: i32,
) -> Option<i32> {
    let product = products.get_mut(&product_id)?;
    let next = product.stock.checked_add(delta)?;
    if next < 0 {
        return None;
    }
    product.stock = next;
    product.updated_at = Utc::now();
    Some(next)
}

fn paginate<T: Clone>(mut items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let start = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(0);
    let items = if start >= items.len() {
        Vec::new()
    } else {
        items.drain(start..).take(limit).collect()
    };
    Page { items, total }
}

impl ProductRepository for InMemoryStore {
    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            category: product.category,
            price: product.price,
            discount_percentage: product.discount_percentage,
            stock: product.stock,
            weight_grams: product.weight_grams,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.products.insert(product.id, product.clone());
        Ok(product)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        let state = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    fn list(
        &self,
        page: PageRequest,
        category: Option<Category>,
    ) -> Result<Page<Product>, DomainError> {
        let state = self.lock()?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(products, page))
    }

    fn update(&self, id: Uuid, update: ProductUpdate) -> Result<Option<Product>, DomainError> {
        let mut state = self.lock()?;
        let Some(product) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        update.apply_to(product);
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Product, DomainError> {
        let mut state = self.lock()?;
        if !state.products.contains_key(&id) {
            return Err(DomainError::not_found("Product"));
        }
        if apply_stock_delta(&mut state.products, id, delta).is_none() {
            return Err(DomainError::invalid_argument(
                "stock adjustment would make stock negative",
            ));
        }
        state
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Product"))
    }
}

impl CartRepository for InMemoryStore {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, DomainError> {
        Ok(self.lock()?.carts.get(&user_id).map(|cart| Cart {
            coupon: None,
            totals: CartTotals::default(),
            ..cart.clone()
        }))
    }

    fn save(&self, cart: &Cart) -> Result<(), DomainError> {
        self.lock()?.carts.insert(cart.user_id, cart.clone());
        Ok(())
    }
}

impl CouponRepository for InMemoryStore {
    fn create(&self, coupon: NewCoupon) -> Result<Coupon, DomainError> {
        let mut state = self.lock()?;
        let code = normalize_code(&coupon.code);
        if state.coupons.values().any(|c| c.code == code) {
            return Err(DomainError::invalid_state(format!(
                "coupon {code} already exists"
            )));
        }
        let coupon = coupon.into_coupon(Uuid::new_v4(), Utc::now());
        state.coupons.insert(coupon.id, coupon.clone());
        Ok(coupon)
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        let code = normalize_code(code);
        Ok(self
            .lock()?
            .coupons
            .values()
            .find(|c| c.code == code)
            .cloned())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, DomainError> {
        Ok(self.lock()?.coupons.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Coupon>, DomainError> {
        let mut coupons: Vec<Coupon> = self.lock()?.coupons.values().cloned().collect();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(coupons)
    }
}

impl OrderRepository for InMemoryStore {
    fn place(&self, placement: &OrderPlacement) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        let order = &placement.order;

        let lines: Option<Vec<(Uuid, i32)>> = state
            .carts
            .values()
            .find(|c| c.id == placement.cart_id)
            .map(|c| c.items.iter().map(|i| (i.product_id, i.quantity)).collect());
        if lines.as_ref() != Some(&placement.cart_lines) {
            return Err(DomainError::invalid_state("cart changed"));
        }

        let mut products = state.products.clone();
        for item in &order.items {
            if apply_stock_delta(&mut products, item.product_id, -item.quantity).is_none() {
                let available = products.get(&item.product_id).map_or(0, |p| p.stock);
                return Err(DomainError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available,
                });
            }
        }

        let mut coupons = state.coupons.clone();
        if let Some(coupon_id) = placement.coupon_id {
            let coupon = coupons
                .get_mut(&coupon_id)
                .ok_or_else(|| DomainError::not_found("Coupon"))?;
            if coupon.usage_limit.is_some_and(|limit| coupon.used_count >= limit) {
                return Err(DomainError::invalid_state("coupon usage limit reached"));
            }
            coupon.used_count += 1;
        }

        state.products = products;
        state.coupons = coupons;
        if let Some(cart) = state.carts.values_mut().find(|c| c.id == placement.cart_id) {
            cart.clear(order.created_at);
        }
        state.orders.insert(order.id, order.clone());
        state.outbox.push(("OrderPlaced".to_string(), order.id));
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    fn list(&self, user_id: Option<Uuid>, page: PageRequest) -> Result<Page<Order>, DomainError> {
        let state = self.lock()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| user_id.map_or(true, |u| o.user_id == u))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(orders, page))
    }

    fn save_transition(&self, order: &Order, transition: &Transition) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        let current = state
            .orders
            .get(&order.id)
            .ok_or_else(|| DomainError::not_found("Order"))?;
        if current.status != transition.from || current.payment_status != transition.from_payment
        {
            return Err(DomainError::invalid_state(
                "order was modified concurrently",
            ));
        }

        if transition.restock {
            let mut products = state.products.clone();
            for item in &order.items {
                // Products deleted since checkout have nothing to restock.
                if products.contains_key(&item.product_id)
                    && apply_stock_delta(&mut products, item.product_id, item.quantity).is_none()
                {
                    return Err(DomainError::Internal(format!(
                        "could not restock product {}",
                        item.product_id
                    )));
                }
            }
            state.products = products;
        }

        state.orders.insert(order.id, order.clone());
        state
            .outbox
            .push((transition.event.as_str().to_string(), order.id));
        Ok(())
    }
}
