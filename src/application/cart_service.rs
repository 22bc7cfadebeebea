use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::coupon::Coupon;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CouponRepository, ProductRepository};
use crate::domain::product::{Category, Product};

/// A cart with derived totals and the live products its lines reference.
#[derive(Debug, Clone)]
pub struct CartView {
    pub cart: Cart,
    pub products: HashMap<Uuid, Product>,
}

impl CartView {
    pub fn product(&self, product_id: Uuid) -> Option<&Product> {
        self.products.get(&product_id)
    }
}

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    coupons: Arc<dyn CouponRepository>,
}

impl CartService {
    pub fn new(
        carts: Arc<dyn CartRepository>,
        products: Arc<dyn ProductRepository>,
        coupons: Arc<dyn CouponRepository>,
    ) -> Self {
        Self {
            carts,
            products,
            coupons,
        }
    }

    /// The user's cart, or an empty unsaved one if they never added anything.
    pub fn get_cart(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let now = Utc::now();
        let cart = self
            .carts
            .find_by_user(user_id)?
            .unwrap_or_else(|| Cart::new(user_id, now));
        self.view(cart, now)
    }

    pub fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity < 1 {
            return Err(DomainError::invalid_argument("quantity must be at least 1"));
        }
        let now = Utc::now();
        let product = self
            .products
            .find_by_id(product_id)?
            .ok_or_else(|| DomainError::not_found("Product"))?;

        let mut cart = self
            .carts
            .find_by_user(user_id)?
            .unwrap_or_else(|| Cart::new(user_id, now));
        cart.add_item(&product, quantity, now)?;
        self.carts.save(&cart)?;

        self.view(cart, now)
    }

    pub fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity < 1 {
            return Err(DomainError::invalid_argument("quantity must be at least 1"));
        }
        let now = Utc::now();
        let mut cart = self.existing_cart(user_id)?;
        let product_id = cart
            .item(item_id)
            .map(|i| i.product_id)
            .ok_or_else(|| DomainError::not_found("Cart item"))?;
        let product = self
            .products
            .find_by_id(product_id)?
            .ok_or_else(|| DomainError::not_found("Product"))?;

        cart.update_item(item_id, quantity, &product, now)?;
        self.carts.save(&cart)?;

        self.view(cart, now)
    }

    pub fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let now = Utc::now();
        let mut cart = self.existing_cart(user_id)?;
        cart.remove_item(item_id, now)?;
        self.carts.save(&cart)?;

        self.view(cart, now)
    }

    pub fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let now = Utc::now();
        let Some(mut cart) = self.carts.find_by_user(user_id)? else {
            return self.view(Cart::new(user_id, now), now);
        };
        cart.clear(now);
        self.carts.save(&cart)?;

        self.view(cart, now)
    }

    /// Attaches the coupon `code` to the user's cart and returns the discount it earns.
    pub fn apply_coupon(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<(CartView, BigDecimal), DomainError> {
        let now = Utc::now();
        let mut cart = self.existing_cart(user_id)?;
        if cart.is_empty() {
            return Err(DomainError::invalid_state("cart is empty"));
        }

        let coupon = self
            .coupons
            .find_by_code(code)?
            .filter(|c| c.active)
            .ok_or_else(|| DomainError::not_found("Coupon"))?;
        if !coupon.is_valid(now) {
            return Err(DomainError::invalid_state("coupon is expired or used up"));
        }

        let products = self.load_products(&cart)?;
        let subtotal = cart.subtotal();
        if subtotal < coupon.min_purchase {
            return Err(DomainError::invalid_argument(format!(
                "minimum purchase of {} not met",
                coupon.min_purchase
            )));
        }
        if !coupon.applies_to(lines(&cart, &products)) {
            return Err(DomainError::invalid_argument(
                "coupon does not apply to any item in the cart",
            ));
        }

        cart.attach_coupon(&coupon);
        cart.recompute_totals(Some(&coupon), now);
        cart.updated_at = now;
        self.carts.save(&cart)?;

        let discount = cart.totals.discount.clone();
        Ok((CartView { cart, products }, discount))
    }

    pub fn remove_coupon(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let now = Utc::now();
        let mut cart = self.existing_cart(user_id)?;
        if cart.coupon_id.is_some() {
            cart.detach_coupon();
            cart.updated_at = now;
            self.carts.save(&cart)?;
        }

        self.view(cart, now)
    }

    fn existing_cart(&self, user_id: Uuid) -> Result<Cart, DomainError> {
        self.carts
            .find_by_user(user_id)?
            .ok_or_else(|| DomainError::not_found("Cart"))
    }

    fn load_products(&self, cart: &Cart) -> Result<HashMap<Uuid, Product>, DomainError> {
        Ok(self
            .products
            .find_many(&cart.product_ids())?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }

    /// Resolves the attached coupon, recomputes totals and persists the
    /// detachment of a coupon that stopped applying.
    fn view(&self, mut cart: Cart, now: DateTime<Utc>) -> Result<CartView, DomainError> {
        let products = self.load_products(&cart)?;
        let coupon = self.resolve_coupon(&cart, &products)?;

        let attached = cart.coupon_id;
        cart.recompute_totals(coupon.as_ref(), now);
        if attached.is_some() && cart.coupon_id.is_none() {
            log::info!("detaching stale coupon from cart {}", cart.id);
            self.carts.save(&cart)?;
        }

        Ok(CartView { cart, products })
    }

    fn resolve_coupon(
        &self,
        cart: &Cart,
        products: &HashMap<Uuid, Product>,
    ) -> Result<Option<Coupon>, DomainError> {
        let Some(coupon_id) = cart.coupon_id else {
            return Ok(None);
        };
        Ok(self
            .coupons
            .find_by_id(coupon_id)?
            .filter(|c| c.applies_to(lines(cart, products))))
    }
}

/// `(product id, category)` for every line whose product still exists.
pub(crate) fn lines(cart: &Cart, products: &HashMap<Uuid, Product>) -> Vec<(Uuid, Category)> {
    cart.items
        .iter()
        .filter_map(|i| products.get(&i.product_id).map(|p| (p.id, p.category)))
        .collect()
}
