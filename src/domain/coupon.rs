use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::product::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponKind {
    Percentage,
    Fixed,
}

impl CouponKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Percentage => "percentage",
            CouponKind::Fixed => "fixed",
        }
    }
}

impl FromStr for CouponKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" => Ok(CouponKind::Percentage),
            "fixed" => Ok(CouponKind::Fixed),
            other => Err(DomainError::invalid_argument(format!(
                "unknown coupon type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for CouponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form of a coupon code: trimmed and upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub kind: CouponKind,
    pub amount: BigDecimal,
    pub min_purchase: BigDecimal,
    pub max_discount: Option<BigDecimal>,
    pub product_ids: Vec<Uuid>,
    pub categories: Vec<Category>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.starts_at <= now
            && now <= self.ends_at
            && self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }

    /// Discount earned on `subtotal`; never negative and never above the subtotal.
    pub fn calculate_discount(&self, subtotal: &BigDecimal, now: DateTime<Utc>) -> BigDecimal {
        let zero = BigDecimal::from(0);
        if !self.is_valid(now) || *subtotal < self.min_purchase || *subtotal <= zero {
            return zero;
        }

        let discount = match self.kind {
            CouponKind::Percentage => {
                let raw = (subtotal * &self.amount / BigDecimal::from(100)).round(2);
                match &self.max_discount {
                    Some(cap) if raw > *cap => cap.clone(),
                    _ => raw,
                }
            }
            CouponKind::Fixed => self.amount.clone(),
        };

        if discount > *subtotal {
            subtotal.clone()
        } else {
            discount
        }
    }

    pub fn has_allow_list(&self) -> bool {
        !self.product_ids.is_empty() || !self.categories.is_empty()
    }

    /// True when the coupon is unrestricted or at least one line matches its allow-lists.
    pub fn applies_to<I>(&self, lines: I) -> bool
    where
        I: IntoIterator<Item = (Uuid, Category)>,
    {
        if !self.has_allow_list() {
            return true;
        }
        lines.into_iter().any(|(product_id, category)| {
            self.product_ids.contains(&product_id) || self.categories.contains(&category)
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub kind: CouponKind,
    pub amount: BigDecimal,
    pub min_purchase: BigDecimal,
    pub max_discount: Option<BigDecimal>,
    pub product_ids: Vec<Uuid>,
    pub categories: Vec<Category>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
}

impl NewCoupon {
    pub fn validate(&self) -> Result<(), DomainError> {
        let zero = BigDecimal::from(0);
        if normalize_code(&self.code).is_empty() {
            return Err(DomainError::invalid_argument("coupon code must not be empty"));
        }
        if self.amount <= zero {
            return Err(DomainError::invalid_argument("coupon amount must be positive"));
        }
        if self.kind == CouponKind::Percentage && self.amount > BigDecimal::from(100) {
            return Err(DomainError::invalid_argument(
                "percentage coupons cannot exceed 100",
            ));
        }
        if self.min_purchase < zero {
            return Err(DomainError::invalid_argument(
                "minimum purchase must not be negative",
            ));
        }
        if self.max_discount.as_ref().is_some_and(|cap| *cap <= zero) {
            return Err(DomainError::invalid_argument("maximum discount must be positive"));
        }
        if self.starts_at >= self.ends_at {
            return Err(DomainError::invalid_argument(
                "coupon must start before it ends",
            ));
        }
        if self.usage_limit.is_some_and(|limit| limit < 1) {
            return Err(DomainError::invalid_argument("usage limit must be at least 1"));
        }
        Ok(())
    }

    pub fn into_coupon(self, id: Uuid, now: DateTime<Utc>) -> Coupon {
        // Only percentage coupons carry a cap.
        let max_discount = match self.kind {
            CouponKind::Percentage => self.max_discount,
            CouponKind::Fixed => None,
        };
        Coupon {
            id,
            code: normalize_code(&self.code),
            kind: self.kind,
            amount: self.amount,
            min_purchase: self.min_purchase,
            max_discount,
            product_ids: self.product_ids,
            categories: self.categories,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            usage_limit: self.usage_limit,
            used_count: 0,
            active: true,
            created_at: now,
        }
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::fixtures::{fixed, percentage};
    use super::*;

    #[test]
    fn code_is_normalized_to_upper_case() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
    }

    #[test]
    fn validity_requires_active_window_and_remaining_uses() {
        let now = Utc::now();
        let mut coupon = percentage("SAVE10", 10, None);
        assert!(coupon.is_valid(now));

        coupon.active = false;
        assert!(!coupon.is_valid(now));
        coupon.active = true;

        coupon.ends_at = now - Duration::seconds(1);
        assert!(!coupon.is_valid(now));
        coupon.ends_at = now + Duration::days(1);

        coupon.usage_limit = Some(2);
        coupon.used_count = 2;
        assert!(!coupon.is_valid(now));
        coupon.used_count = 1;
        assert!(coupon.is_valid(now));
    }

    #[test]
    fn percentage_discount_is_capped_by_max_discount() {
        let coupon = percentage("SAVE10", 10, Some(5_000));
        let discount = coupon.calculate_discount(&BigDecimal::from(300_000), Utc::now());
        assert_eq!(discount, BigDecimal::from(5_000));
    }

    #[test]
    fn percentage_discount_without_cap_is_proportional() {
        let coupon = percentage("SAVE10", 10, None);
        let discount = coupon.calculate_discount(&BigDecimal::from(300_000), Utc::now());
        assert_eq!(discount, BigDecimal::from(30_000));
    }

    #[test]
    fn discount_is_zero_below_minimum_purchase() {
        let mut coupon = percentage("SAVE10", 10, None);
        coupon.min_purchase = BigDecimal::from(500_000);
        let discount = coupon.calculate_discount(&BigDecimal::from(300_000), Utc::now());
        assert_eq!(discount, BigDecimal::from(0));
    }

    #[test]
    fn discount_is_zero_for_expired_coupon() {
        let mut coupon = fixed("FLAT", 10_000);
        coupon.ends_at = Utc::now() - Duration::days(1);
        let discount = coupon.calculate_discount(&BigDecimal::from(300_000), Utc::now());
        assert_eq!(discount, BigDecimal::from(0));
    }

    #[test]
    fn fixed_discount_is_clamped_to_subtotal() {
        let coupon = fixed("FLAT", 50_000);
        assert_eq!(
            coupon.calculate_discount(&BigDecimal::from(80_000), Utc::now()),
            BigDecimal::from(50_000)
        );
        assert_eq!(
            coupon.calculate_discount(&BigDecimal::from(20_000), Utc::now()),
            BigDecimal::from(20_000)
        );
    }

    #[test]
    fn unrestricted_coupon_applies_to_anything() {
        let coupon = percentage("ALL", 5, None);
        assert!(coupon.applies_to([(Uuid::new_v4(), Category::Books)]));
    }

    #[test]
    fn allow_lists_match_product_or_category() {
        let product_id = Uuid::new_v4();
        let mut coupon = percentage("BOOKS", 5, None);
        coupon.categories = vec![Category::Books];
        assert!(coupon.applies_to([(Uuid::new_v4(), Category::Books)]));
        assert!(!coupon.applies_to([(product_id, Category::Food)]));

        coupon.product_ids = vec![product_id];
        assert!(coupon.applies_to([(product_id, Category::Food)]));
    }

    #[test]
    fn new_coupon_rejects_inverted_window() {
        let now = Utc::now();
        let new = NewCoupon {
            code: "late".to_string(),
            kind: CouponKind::Fixed,
            amount: BigDecimal::from(1_000),
            min_purchase: BigDecimal::from(0),
            max_discount: None,
            product_ids: Vec::new(),
            categories: Vec::new(),
            starts_at: now,
            ends_at: now - Duration::days(1),
            usage_limit: None,
        };
        assert!(matches!(new.validate(), Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn into_coupon_drops_cap_for_fixed_coupons() {
        let now = Utc::now();
        let coupon = NewCoupon {
            code: "flat".to_string(),
            kind: CouponKind::Fixed,
            amount: BigDecimal::from(1_000),
            min_purchase: BigDecimal::from(0),
            max_discount: Some(BigDecimal::from(500)),
            product_ids: Vec::new(),
            categories: Vec::new(),
            starts_at: now,
            ends_at: now + Duration::days(1),
            usage_limit: Some(10),
        }
        .into_coupon(Uuid::new_v4(), now);
        assert_eq!(coupon.code, "FLAT");
        assert_eq!(coupon.max_discount, None);
        assert_eq!(coupon.used_count, 0);
        assert!(coupon.active);
    }
}
