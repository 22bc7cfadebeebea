use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::Actor;
use super::coupon::Coupon;
use super::errors::DomainError;
use super::pricing::{discounted_line_total, PriceBreakdown, ShippingMethod};
use super::product::Product;

macro_rules! string_enum {
    ($name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::invalid_argument(format!(
                        concat!("unknown ", $what, " '{}'"),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    BankTransfer,
    CreditCard,
    EWallet,
    CashOnDelivery,
}

string_enum!(PaymentMethod, "payment method", {
    BankTransfer => "bank_transfer",
    CreditCard => "credit_card",
    EWallet => "e_wallet",
    CashOnDelivery => "cash_on_delivery",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("recipientName", &self.recipient_name),
            ("phone", &self.phone),
            ("street", &self.street),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
        ];
        match required.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((field, _)) => Err(DomainError::invalid_argument(format!(
                "shipping address {field} is required"
            ))),
            None => Ok(()),
        }
    }
}

/// Line of an order; every field is copied from the catalog at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount_percentage: i32,
    pub weight_grams: i32,
}

impl OrderItem {
    pub fn from_product(product: &Product, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            name: product.name.clone(),
            quantity,
            unit_price: product.price.clone(),
            discount_percentage: product.discount_percentage,
            weight_grams: product.shipping_weight(),
        }
    }

    pub fn line_total(&self) -> BigDecimal {
        discounted_line_total(&self.unit_price, self.discount_percentage, self.quantity)
    }

    pub fn line_weight(&self) -> i64 {
        i64::from(self.weight_grams) * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub notes: Option<String>,
}

/// Kind of committed change, recorded in the order outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEventKind {
    Placed,
    StatusChanged,
    Cancelled,
    PaymentUpdated,
}

impl OrderEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventKind::Placed => "OrderPlaced",
            OrderEventKind::StatusChanged => "OrderStatusChanged",
            OrderEventKind::Cancelled => "OrderCancelled",
            OrderEventKind::PaymentUpdated => "OrderPaymentUpdated",
        }
    }
}

/// A state change applied to an order, to be persisted atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: OrderStatus,
    pub from_payment: PaymentStatus,
    pub to: OrderStatus,
    pub payment_status: PaymentStatus,
    /// `None` when only the payment status changed.
    pub entry: Option<StatusHistoryEntry>,
    /// Return every item's quantity to the catalog.
    pub restock: bool,
    pub event: OrderEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub coupon_discount: BigDecimal,
    pub total_weight: i32,
    pub prices: PriceBreakdown,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub history: Vec<StatusHistoryEntry>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order from priced items.
    ///
    /// `coupon` is honoured only if it is still valid, applies to the items and
    /// earns a discount; that discount comes off the items price before tax.
    pub fn place(
        user_id: Uuid,
        items: Vec<OrderItem>,
        request: CheckoutRequest,
        coupon: Option<&Coupon>,
        lines: &[(Uuid, super::product::Category)],
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::invalid_state("cart is empty"));
        }
        request.shipping_address.validate()?;

        let gross = items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + item.line_total());
        let total_weight: i64 = items.iter().map(OrderItem::line_weight).sum();
        let total_weight = i32::try_from(total_weight)
            .map_err(|_| DomainError::invalid_argument("order is too heavy"))?;

        // A coupon that earns nothing (e.g. the cart fell below its minimum) is not applied.
        let zero = BigDecimal::from(0);
        let applied = coupon
            .filter(|c| c.is_valid(now) && c.applies_to(lines.iter().copied()))
            .map(|c| (c, c.calculate_discount(&gross, now)))
            .filter(|(_, discount)| *discount > zero);
        let coupon_code = applied.as_ref().map(|(c, _)| c.code.clone());
        let coupon_discount = applied.map_or(zero, |(_, discount)| discount);

        let items_price = &gross - &coupon_discount;
        let prices = PriceBreakdown::compute(
            items_price,
            i64::from(total_weight),
            request.shipping_method,
        );

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            items,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            shipping_method: request.shipping_method,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            coupon_code,
            coupon_discount,
            total_weight,
            prices,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                actor_id: Some(user_id),
                note: Some("Order placed".to_string()),
                at: now,
            }],
            paid_at: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.user_id == actor.user_id
    }

    pub fn ensure_visible_to(&self, actor: &Actor) -> Result<(), DomainError> {
        if actor.is_admin() || self.is_owned_by(actor) {
            Ok(())
        } else {
            Err(DomainError::forbidden("not allowed to access this order"))
        }
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Admin-driven fulfilment update.
    pub fn set_status(
        &mut self,
        actor: &Actor,
        target: OrderStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        actor.require_admin()?;
        if target == self.status {
            return Err(DomainError::invalid_state(format!(
                "order is already {}",
                self.status
            )));
        }

        match (self.status, target) {
            (_, OrderStatus::Cancelled) => self.cancel(actor, note, now),
            (_, OrderStatus::Refunded) => Err(DomainError::invalid_argument(
                "refunds go through the payment endpoint",
            )),
            (OrderStatus::Pending, OrderStatus::Processing)
            | (OrderStatus::Pending | OrderStatus::Processing, OrderStatus::Shipped) => {
                Ok(self.transition(
                    target,
                    self.payment_status,
                    Some(actor.user_id),
                    note,
                    false,
                    OrderEventKind::StatusChanged,
                    now,
                ))
            }
            (OrderStatus::Shipped, OrderStatus::Delivered) => {
                self.delivered_at = Some(now);
                Ok(self.transition(
                    target,
                    self.payment_status,
                    Some(actor.user_id),
                    note,
                    false,
                    OrderEventKind::StatusChanged,
                    now,
                ))
            }
            (from, to) => Err(DomainError::invalid_state(format!(
                "cannot move order from {from} to {to}"
            ))),
        }
    }

    /// Cancels a pending or processing order; stock is returned on persist.
    pub fn cancel(
        &mut self,
        actor: &Actor,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        self.ensure_visible_to(actor)?;
        if !self.is_cancellable() {
            return Err(DomainError::invalid_state(format!(
                "order cannot be cancelled once {}",
                self.status
            )));
        }
        self.cancelled_at = Some(now);
        Ok(self.transition(
            OrderStatus::Cancelled,
            self.payment_status,
            Some(actor.user_id),
            reason.or_else(|| Some("Order cancelled".to_string())),
            true,
            OrderEventKind::Cancelled,
            now,
        ))
    }

    /// The owner acknowledges receipt of a shipped order.
    pub fn confirm_delivery(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        if !self.is_owned_by(actor) {
            return Err(DomainError::forbidden(
                "only the order owner can confirm delivery",
            ));
        }
        if self.status != OrderStatus::Shipped {
            return Err(DomainError::invalid_state(format!(
                "order is {}, not shipped",
                self.status
            )));
        }
        self.delivered_at = Some(now);
        Ok(self.transition(
            OrderStatus::Delivered,
            self.payment_status,
            Some(actor.user_id),
            Some("Delivery confirmed by customer".to_string()),
            false,
            OrderEventKind::StatusChanged,
            now,
        ))
    }

    /// Applies a payment outcome reported by the payment provider.
    pub fn record_payment(
        &mut self,
        actor: &Actor,
        outcome: PaymentStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        actor.require_admin()?;
        match outcome {
            PaymentStatus::Paid => {
                if self.status != OrderStatus::Pending
                    || !matches!(self.payment_status, PaymentStatus::Pending | PaymentStatus::Failed)
                {
                    return Err(DomainError::invalid_state(format!(
                        "payment cannot be confirmed for a {} order with {} payment",
                        self.status, self.payment_status
                    )));
                }
                self.paid_at = Some(now);
                Ok(self.transition(
                    OrderStatus::Processing,
                    PaymentStatus::Paid,
                    Some(actor.user_id),
                    note.or_else(|| Some("Payment confirmed".to_string())),
                    false,
                    OrderEventKind::PaymentUpdated,
                    now,
                ))
            }
            PaymentStatus::Failed => {
                if self.status != OrderStatus::Pending
                    || self.payment_status != PaymentStatus::Pending
                {
                    return Err(DomainError::invalid_state(format!(
                        "payment failure cannot be recorded for a {} order with {} payment",
                        self.status, self.payment_status
                    )));
                }
                let from = self.status;
                let from_payment = self.payment_status;
                self.payment_status = PaymentStatus::Failed;
                self.updated_at = now;
                Ok(Transition {
                    from,
                    from_payment,
                    to: from,
                    payment_status: PaymentStatus::Failed,
                    entry: None,
                    restock: false,
                    event: OrderEventKind::PaymentUpdated,
                })
            }
            PaymentStatus::Refunded => {
                // Any state reached after payment, including a cancellation of a paid order.
                let refundable = matches!(
                    self.status,
                    OrderStatus::Processing
                        | OrderStatus::Shipped
                        | OrderStatus::Delivered
                        | OrderStatus::Cancelled
                );
                if !refundable || self.payment_status != PaymentStatus::Paid {
                    return Err(DomainError::invalid_state(format!(
                        "a {} order with {} payment cannot be refunded",
                        self.status, self.payment_status
                    )));
                }
                Ok(self.transition(
                    OrderStatus::Refunded,
                    PaymentStatus::Refunded,
                    Some(actor.user_id),
                    note.or_else(|| Some("Payment refunded".to_string())),
                    false,
                    OrderEventKind::PaymentUpdated,
                    now,
                ))
            }
            PaymentStatus::Pending => Err(DomainError::invalid_argument(
                "payment cannot be reset to pending",
            )),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn transition(
        &mut self,
        to: OrderStatus,
        payment_status: PaymentStatus,
        actor_id: Option<Uuid>,
        note: Option<String>,
        restock: bool,
        event: OrderEventKind,
        now: DateTime<Utc>,
    ) -> Transition {
        let entry = StatusHistoryEntry {
            status: to,
            actor_id,
            note,
            at: now,
        };
        let transition = Transition {
            from: self.status,
            from_payment: self.payment_status,
            to,
            payment_status,
            entry: Some(entry.clone()),
            restock,
            event,
        };
        self.status = to;
        self.payment_status = payment_status;
        self.history.push(entry);
        self.updated_at = now;
        transition
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn address() -> ShippingAddress {
        ShippingAddress {
            recipient_name: "Sari".to_string(),
            phone: "0812000000".to_string(),
            street: "Jl. Merdeka 1".to_string(),
            city: "Bandung".to_string(),
            province: "Jawa Barat".to_string(),
            postal_code: "40111".to_string(),
        }
    }

    pub fn request(method: ShippingMethod) -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: address(),
            payment_method: PaymentMethod::BankTransfer,
            shipping_method: method,
            notes: None,
        }
    }
}
