use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::domain::coupon::{Coupon, CouponKind, NewCoupon};
use crate::domain::product::Category;
use crate::errors::AppError;
use crate::AppState;

use super::cart::CartResponse;
use super::{created, money, ok, parse_money, timestamp};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyCouponRequest {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplyCouponResponse {
    pub cart: CartResponse,
    pub discount: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    pub code: String,
    /// `percentage` or `fixed`
    pub kind: String,
    pub amount: String,
    pub min_purchase: Option<String>,
    /// Cap on the discount; only meaningful for percentage coupons.
    pub max_discount: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
}

impl CreateCouponRequest {
    fn into_domain(self) -> Result<NewCoupon, AppError> {
        let categories = self
            .categories
            .iter()
            .map(|c| c.parse::<Category>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NewCoupon {
            kind: self.kind.parse::<CouponKind>()?,
            amount: parse_money("amount", &self.amount)?,
            min_purchase: match self.min_purchase {
                Some(v) => parse_money("minPurchase", &v)?,
                None => BigDecimal::from(0),
            },
            max_discount: self
                .max_discount
                .map(|v| parse_money("maxDiscount", &v))
                .transpose()?,
            code: self.code,
            product_ids: self.product_ids,
            categories,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            usage_limit: self.usage_limit,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    pub id: Uuid,
    pub code: String,
    pub kind: String,
    pub amount: String,
    pub min_purchase: String,
    pub max_discount: Option<String>,
    pub product_ids: Vec<Uuid>,
    pub categories: Vec<String>,
    pub starts_at: String,
    pub ends_at: String,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub active: bool,
    pub created_at: String,
}

impl From<Coupon> for CouponResponse {
    fn from(c: Coupon) -> Self {
        Self {
            id: c.id,
            kind: c.kind.to_string(),
            amount: money(&c.amount),
            min_purchase: money(&c.min_purchase),
            max_discount: c.max_discount.as_ref().map(money),
            categories: c.categories.iter().map(Category::to_string).collect(),
            starts_at: timestamp(&c.starts_at),
            ends_at: timestamp(&c.ends_at),
            created_at: timestamp(&c.created_at),
            code: c.code,
            product_ids: c.product_ids,
            usage_limit: c.usage_limit,
            used_count: c.used_count,
            active: c.active,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /coupons/apply
#[utoipa::path(
    post,
    path = "/coupons/apply",
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Coupon attached to the cart", body = ApplyCouponResponse),
        (status = 400, description = "Coupon expired, below minimum purchase or not applicable"),
        (status = 404, description = "Unknown or inactive coupon"),
    ),
    tag = "coupons"
)]
pub async fn apply_coupon(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<ApplyCouponRequest>,
) -> Result<HttpResponse, AppError> {
    let code = body.into_inner().code;
    let carts = state.carts.clone();
    let (view, discount) =
        web::block(move || carts.apply_coupon(actor.user_id, &code)).await??;
    Ok(ok(ApplyCouponResponse {
        cart: CartResponse::from(view),
        discount: money(&discount),
    }))
}

/// DELETE /coupons/apply
#[utoipa::path(
    delete,
    path = "/coupons/apply",
    responses(
        (status = 200, description = "Coupon removed from the cart", body = CartResponse),
        (status = 404, description = "No cart"),
    ),
    tag = "coupons"
)]
pub async fn remove_coupon(
    state: web::Data<AppState>,
    actor: Actor,
) -> Result<HttpResponse, AppError> {
    let carts = state.carts.clone();
    let view = web::block(move || carts.remove_coupon(actor.user_id)).await??;
    Ok(ok(CartResponse::from(view)))
}

/// POST /coupons
#[utoipa::path(
    post,
    path = "/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = CouponResponse),
        (status = 400, description = "Invalid coupon or duplicate code"),
        (status = 403, description = "Admin role required"),
    ),
    tag = "coupons"
)]
pub async fn create_coupon(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<CreateCouponRequest>,
) -> Result<HttpResponse, AppError> {
    let coupon = body.into_inner().into_domain()?;
    let coupons = state.coupons.clone();
    let coupon = web::block(move || coupons.create(&actor, coupon)).await??;
    Ok(created(CouponResponse::from(coupon)))
}

/// GET /coupons
#[utoipa::path(
    get,
    path = "/coupons",
    responses(
        (status = 200, description = "All coupons, newest first", body = Vec<CouponResponse>),
        (status = 403, description = "Admin role required"),
    ),
    tag = "coupons"
)]
pub async fn list_coupons(
    state: web::Data<AppState>,
    actor: Actor,
) -> Result<HttpResponse, AppError> {
    let coupons = state.coupons.clone();
    let list = web::block(move || coupons.list(&actor)).await??;
    Ok(ok(list
        .into_iter()
        .map(CouponResponse::from)
        .collect::<Vec<_>>()))
}
