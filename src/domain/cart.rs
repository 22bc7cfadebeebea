use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::coupon::Coupon;
use super::errors::DomainError;
use super::product::Product;

#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price captured when the product was first added.
    pub price: BigDecimal,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.price * BigDecimal::from(self.quantity)
    }
}

/// Coupon attached to a cart together with the discount it currently yields.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: String,
    pub discount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartTotals {
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

impl Default for CartTotals {
    fn default() -> Self {
        Self {
            subtotal: BigDecimal::from(0),
            discount: BigDecimal::from(0),
            total: BigDecimal::from(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    /// Id of the attached coupon as persisted; resolved into `coupon` on recompute.
    pub coupon_id: Option<Uuid>,
    pub coupon: Option<AppliedCoupon>,
    pub totals: CartTotals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            items: Vec::new(),
            coupon_id: None,
            coupon: None,
            totals: CartTotals::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|i| i.product_id).collect()
    }

    /// Adds `quantity` of `product`, merging into an existing line for the same product.
    ///
    /// Stock is checked against the quantity the line will hold afterwards, not
    /// just the amount being added.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<&CartItem, DomainError> {
        if quantity < 1 {
            return Err(DomainError::invalid_argument("quantity must be at least 1"));
        }

        let position = self.items.iter().position(|i| i.product_id == product.id);
        let existing = position
            .and_then(|idx| self.items.get(idx))
            .map_or(0, |i| i.quantity);
        let cumulative = existing
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invalid_argument("quantity is too large"))?;
        product.ensure_available(cumulative)?;

        let idx = match position {
            Some(idx) => {
                if let Some(item) = self.items.get_mut(idx) {
                    item.quantity = cumulative;
                }
                idx
            }
            None => {
                self.items.push(CartItem {
                    id: Uuid::new_v4(),
                    product_id: product.id,
                    quantity,
                    price: product.price.clone(),
                    added_at: now,
                });
                self.items.len() - 1
            }
        };
        self.updated_at = now;

        self.items
            .get(idx)
            .ok_or_else(|| DomainError::Internal("cart line vanished".to_string()))
    }

    /// Replaces the quantity of a line after checking it against `product`'s live stock.
    pub fn update_item(
        &mut self,
        item_id: Uuid,
        quantity: i32,
        product: &Product,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if quantity < 1 {
            return Err(DomainError::invalid_argument("quantity must be at least 1"));
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| DomainError::not_found("Cart item"))?;
        if item.product_id != product.id {
            return Err(DomainError::Internal(
                "product does not match cart line".to_string(),
            ));
        }
        product.ensure_available(quantity)?;
        item.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: Uuid, now: DateTime<Utc>) -> Result<(), DomainError> {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() == before {
            return Err(DomainError::not_found("Cart item"));
        }
        self.updated_at = now;
        Ok(())
    }

    /// Empties the cart and drops any coupon; the cart itself is kept.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.detach_coupon();
        self.totals = CartTotals::default();
        self.updated_at = now;
    }

    pub fn attach_coupon(&mut self, coupon: &Coupon) {
        self.coupon_id = Some(coupon.id);
        self.coupon = Some(AppliedCoupon {
            coupon_id: coupon.id,
            code: coupon.code.clone(),
            discount: BigDecimal::from(0),
        });
    }

    pub fn detach_coupon(&mut self) {
        self.coupon_id = None;
        self.coupon = None;
    }

    pub fn subtotal(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::from(0), |acc, i| acc + i.line_total())
    }

    /// Recomputes totals from the line items.
    ///
    /// `coupon` is the attached coupon as resolved by the caller, already
    /// filtered for applicability; `None` or an invalid coupon detaches it.
    pub fn recompute_totals(&mut self, coupon: Option<&Coupon>, now: DateTime<Utc>) {
        let subtotal = self.subtotal();
        let zero = BigDecimal::from(0);

        let discount = match coupon {
            Some(c) if Some(c.id) == self.coupon_id && c.is_valid(now) => {
                let discount = c.calculate_discount(&subtotal, now);
                self.coupon = Some(AppliedCoupon {
                    coupon_id: c.id,
                    code: c.code.clone(),
                    discount: discount.clone(),
                });
                discount
            }
            _ => {
                self.detach_coupon();
                zero.clone()
            }
        };

        let total = &subtotal - &discount;
        self.totals = CartTotals {
            subtotal,
            discount,
            total: if total < zero { zero } else { total },
        };
    }
}
