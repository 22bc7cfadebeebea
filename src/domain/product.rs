use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Weight assumed for products that carry no weight of their own.
pub const DEFAULT_WEIGHT_GRAMS: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Fashion,
    Home,
    Beauty,
    Sports,
    Books,
    Food,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Electronics,
        Category::Fashion,
        Category::Home,
        Category::Beauty,
        Category::Sports,
        Category::Books,
        Category::Food,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Fashion => "fashion",
            Category::Home => "home",
            Category::Beauty => "beauty",
            Category::Sports => "sports",
            Category::Books => "books",
            Category::Food => "food",
            Category::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| DomainError::invalid_argument(format!("unknown category '{s}'")))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub price: BigDecimal,
    pub discount_percentage: i32,
    pub stock: i32,
    pub weight_grams: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn shipping_weight(&self) -> i32 {
        self.weight_grams.unwrap_or(DEFAULT_WEIGHT_GRAMS)
    }

    pub fn ensure_available(&self, requested: i32) -> Result<(), DomainError> {
        if requested > self.stock {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                requested,
                available: self.stock,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub price: BigDecimal,
    pub discount_percentage: i32,
    pub stock: i32,
    pub weight_grams: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<BigDecimal>,
    pub discount_percentage: Option<i32>,
    pub weight_grams: Option<i32>,
}

fn validate_fields(
    name: Option<&str>,
    price: Option<&BigDecimal>,
    discount_percentage: Option<i32>,
    weight_grams: Option<i32>,
) -> Result<(), DomainError> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(DomainError::invalid_argument("name must not be empty"));
    }
    if price.is_some_and(|p| *p < BigDecimal::from(0)) {
        return Err(DomainError::invalid_argument("price must not be negative"));
    }
    if discount_percentage.is_some_and(|d| !(0..=100).contains(&d)) {
        return Err(DomainError::invalid_argument(
            "discount percentage must be between 0 and 100",
        ));
    }
    if weight_grams.is_some_and(|w| w <= 0) {
        return Err(DomainError::invalid_argument("weight must be positive"));
    }
    Ok(())
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_fields(
            Some(&self.name),
            Some(&self.price),
            Some(self.discount_percentage),
            self.weight_grams,
        )?;
        if self.stock < 0 {
            return Err(DomainError::invalid_argument("stock must not be negative"));
        }
        Ok(())
    }
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_fields(
            self.name.as_deref(),
            self.price.as_ref(),
            self.discount_percentage,
            self.weight_grams,
        )
    }

    /// Applies the set fields onto `product`.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(price) = &self.price {
            product.price = price.clone();
        }
        if let Some(discount) = self.discount_percentage {
            product.discount_percentage = discount;
        }
        if let Some(weight) = self.weight_grams {
            product.weight_grams = Some(weight);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: i64, limit: i64) -> Result<Self, DomainError> {
        if page < 1 {
            return Err(DomainError::invalid_argument("page must be at least 1"));
        }
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err(DomainError::invalid_argument(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_strings() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert!("gadgets".parse::<Category>().is_err());
    }

    #[test]
    fn shipping_weight_defaults_to_500_grams() {
        let mut p = fixtures::product(100, 1);
        assert_eq!(p.shipping_weight(), 500);
        p.weight_grams = Some(1200);
        assert_eq!(p.shipping_weight(), 1200);
    }

    #[test]
    fn ensure_available_reports_available_stock() {
        let p = fixtures::product(100, 2);
        assert!(p.ensure_available(2).is_ok());
        assert_eq!(
            p.ensure_available(3),
            Err(DomainError::InsufficientStock {
                product_id: p.id,
                requested: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn new_product_rejects_out_of_range_discount() {
        let product = NewProduct {
            name: "Lamp".to_string(),
            description: String::new(),
            category: Category::Home,
            price: BigDecimal::from(50_000),
            discount_percentage: 120,
            stock: 3,
            weight_grams: Some(800),
        };
        assert!(matches!(
            product.validate(),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn page_request_rejects_bad_windows() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, 101).is_err());
        assert_eq!(PageRequest::new(3, 20).map(|p| p.offset()), Ok(40));
    }
}
