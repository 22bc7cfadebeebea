use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::domain::errors::DomainError;
use crate::domain::notification::Notification;
use crate::domain::order::{
    CheckoutRequest, Order, OrderItem, OrderStatus, PaymentStatus, Transition,
};
use crate::domain::ports::{
    CartRepository, CouponRepository, OrderPlacement, OrderRepository, ProductRepository,
};
use crate::domain::product::{Page, PageRequest, Product};

use super::cart_service::lines;
use super::side_effects::{product_cache_key, SideEffects};

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    coupons: Arc<dyn CouponRepository>,
    effects: SideEffects,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        carts: Arc<dyn CartRepository>,
        products: Arc<dyn ProductRepository>,
        coupons: Arc<dyn CouponRepository>,
        effects: SideEffects,
    ) -> Self {
        Self {
            orders,
            carts,
            products,
            coupons,
            effects,
        }
    }

    /// Turns the actor's cart into a pending order.
    ///
    /// Stock is validated here against live products and reserved again
    /// inside the placement transaction, which wins any race.
    pub fn checkout(&self, actor: &Actor, request: CheckoutRequest) -> Result<Order, DomainError> {
        let now = Utc::now();
        let cart = self
            .carts
            .find_by_user(actor.user_id)?
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DomainError::invalid_state("cart is empty"))?;

        let products: HashMap<Uuid, Product> = self
            .products
            .find_many(&cart.product_ids())?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = cart
            .items
            .iter()
            .map(|line| {
                let product = products
                    .get(&line.product_id)
                    .ok_or_else(|| DomainError::not_found("Product"))?;
                product.ensure_available(line.quantity)?;
                Ok(OrderItem::from_product(product, line.quantity))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let coupon = match cart.coupon_id {
            Some(id) => self.coupons.find_by_id(id)?,
            None => None,
        };

        let order = Order::place(
            actor.user_id,
            items,
            request,
            coupon.as_ref(),
            &lines(&cart, &products),
            now,
        )?;
        if coupon.is_some() && order.coupon_code.is_none() {
            log::info!("coupon on cart {} no longer applies, dropped", cart.id);
        }

        let coupon_id = coupon
            .filter(|_| order.coupon_code.is_some())
            .map(|c| c.id);
        let placement = OrderPlacement::new(order, &cart, coupon_id);
        self.orders.place(&placement)?;
        let order = placement.order;

        log::info!(
            "order {} placed by {} total {}",
            order.id,
            order.user_id,
            order.prices.total_price
        );
        for item in &order.items {
            self.effects.invalidate(product_cache_key(item.product_id));
        }
        self.effects.notify(Notification::order_placed(&order));

        Ok(order)
    }

    pub fn get(&self, actor: &Actor, id: Uuid) -> Result<Order, DomainError> {
        let order = self.load(id)?;
        order.ensure_visible_to(actor)?;
        Ok(order)
    }

    /// Customers see their own orders, admins see everyone's.
    pub fn list(&self, actor: &Actor, page: PageRequest) -> Result<Page<Order>, DomainError> {
        let owner = if actor.is_admin() {
            None
        } else {
            Some(actor.user_id)
        };
        self.orders.list(owner, page)
    }

    pub fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: OrderStatus,
        note: Option<String>,
    ) -> Result<Order, DomainError> {
        self.apply(id, |order| order.set_status(actor, status, note, Utc::now()))
    }

    pub fn cancel(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Order, DomainError> {
        self.apply(id, |order| order.cancel(actor, reason, Utc::now()))
    }

    pub fn confirm_delivery(&self, actor: &Actor, id: Uuid) -> Result<Order, DomainError> {
        self.apply(id, |order| order.confirm_delivery(actor, Utc::now()))
    }

    pub fn record_payment(
        &self,
        actor: &Actor,
        id: Uuid,
        outcome: PaymentStatus,
        note: Option<String>,
    ) -> Result<Order, DomainError> {
        self.apply(id, |order| {
            order.record_payment(actor, outcome, note, Utc::now())
        })
    }

    fn load(&self, id: Uuid) -> Result<Order, DomainError> {
        self.orders
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    fn apply<F>(&self, id: Uuid, change: F) -> Result<Order, DomainError>
    where
        F: FnOnce(&mut Order) -> Result<Transition, DomainError>,
    {
        let mut order = self.load(id)?;
        let transition = change(&mut order)?;
        self.orders.save_transition(&order, &transition)?;

        log::info!(
            "order {} moved {} -> {} (payment {} -> {})",
            order.id,
            transition.from,
            transition.to,
            transition.from_payment,
            transition.payment_status
        );
        if transition.restock {
            for item in &order.items {
                self.effects.invalidate(product_cache_key(item.product_id));
            }
        }
        if transition.entry.is_some() {
            self.effects.notify(Notification::status_changed(&order));
        }

        Ok(order)
    }
}
