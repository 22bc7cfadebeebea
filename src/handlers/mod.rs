pub mod cart;
pub mod coupons;
pub mod health;
pub mod identity;
pub mod orders;
pub mod products;

use std::str::FromStr;

use actix_web::HttpResponse;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::pricing::round_money;
use crate::errors::AppError;

// ── Envelope ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Envelope<T> {
    status: &'static str,
    data: T,
}

pub(crate) fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        status: "success",
        data,
    })
}

pub(crate) fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope {
        status: "success",
        data,
    })
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_limit() -> i64 {
    20
}

// ── Wire formats ─────────────────────────────────────────────────────────────

/// Amounts travel as decimal strings with two fraction digits, e.g. "9.99",
/// rounded the same way order prices are.
pub(crate) fn money(amount: &BigDecimal) -> String {
    round_money(amount.clone()).with_scale(2).to_string()
}

pub(crate) fn parse_money(field: &str, value: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(value.trim())
        .map_err(|_| AppError::BadRequest(format!("{field} must be a decimal amount")))
}

pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339()
}
