use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;

use super::errors::DomainError;

/// Tax applied to the items price, in percent.
pub const TAX_PERCENT: i64 = 11;

/// Weight covered by one shipping unit.
pub const GRAMS_PER_SHIPPING_UNIT: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShippingMethod {
    Regular,
    Express,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Regular => "regular",
            ShippingMethod::Express => "express",
        }
    }

    /// Price per started kilogram.
    pub fn rate(&self) -> i64 {
        match self {
            ShippingMethod::Regular => 10_000,
            ShippingMethod::Express => 20_000,
        }
    }
}

impl FromStr for ShippingMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(ShippingMethod::Regular),
            "express" => Ok(ShippingMethod::Express),
            other => Err(DomainError::invalid_argument(format!(
                "unknown shipping method '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn round_money(amount: BigDecimal) -> BigDecimal {
    amount.round(2)
}

/// `price × (1 − discount/100) × quantity`.
pub fn discounted_line_total(
    unit_price: &BigDecimal,
    discount_percentage: i32,
    quantity: i32,
) -> BigDecimal {
    let remaining = BigDecimal::from(100 - discount_percentage.clamp(0, 100));
    unit_price * remaining * BigDecimal::from(quantity) / BigDecimal::from(100)
}

/// `max(1, ceil(weight / 1000)) × rate`.
pub fn shipping_price(total_weight_grams: i64, method: ShippingMethod) -> BigDecimal {
    let started_units = (total_weight_grams.max(0) + GRAMS_PER_SHIPPING_UNIT - 1)
        / GRAMS_PER_SHIPPING_UNIT;
    BigDecimal::from(started_units.max(1) * method.rate())
}

pub fn tax_price(items_price: &BigDecimal) -> BigDecimal {
    round_money(items_price * BigDecimal::from(TAX_PERCENT) / BigDecimal::from(100))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub items_price: BigDecimal,
    pub shipping_price: BigDecimal,
    pub tax_price: BigDecimal,
    pub total_price: BigDecimal,
}

impl PriceBreakdown {
    pub fn compute(items_price: BigDecimal, total_weight_grams: i64, method: ShippingMethod) -> Self {
        let items_price = round_money(items_price);
        let shipping_price = shipping_price(total_weight_grams, method);
        let tax_price = tax_price(&items_price);
        let total_price = &items_price + &shipping_price + &tax_price;
        Self {
            items_price,
            shipping_price,
            tax_price,
            total_price,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.total_price == &self.items_price + &self.shipping_price + &self.tax_price
    }
}
