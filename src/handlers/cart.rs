use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::cart_service::CartView;
use crate::domain::actor::Actor;
use crate::errors::AppError;
use crate::AppState;

use super::{money, ok, timestamp};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    /// `None` when the product has since been removed from the catalog.
    pub name: Option<String>,
    pub stock: Option<i32>,
    pub quantity: i32,
    /// Unit price captured when the product was first added.
    pub price: String,
    pub line_total: String,
    pub added_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCouponResponse {
    pub code: String,
    pub discount: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItemResponse>,
    pub coupon: Option<AppliedCouponResponse>,
    pub subtotal: String,
    pub discount: String,
    pub total: String,
    pub updated_at: String,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        let items = view
            .cart
            .items
            .iter()
            .map(|item| {
                let product = view.product(item.product_id);
                CartItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    name: product.map(|p| p.name.clone()),
                    stock: product.map(|p| p.stock),
                    quantity: item.quantity,
                    price: money(&item.price),
                    line_total: money(&item.line_total()),
                    added_at: timestamp(&item.added_at),
                }
            })
            .collect();
        let cart = view.cart;

        Self {
            id: cart.id,
            user_id: cart.user_id,
            items,
            coupon: cart.coupon.map(|c| AppliedCouponResponse {
                code: c.code,
                discount: money(&c.discount),
            }),
            subtotal: money(&cart.totals.subtotal),
            discount: money(&cart.totals.discount),
            total: money(&cart.totals.total),
            updated_at: timestamp(&cart.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "The caller's cart with live product data", body = CartResponse),
        (status = 401, description = "Missing identity"),
    ),
    tag = "cart"
)]
pub async fn get_cart(state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse, AppError> {
    let carts = state.carts.clone();
    let view = web::block(move || carts.get_cart(actor.user_id)).await??;
    Ok(ok(CartResponse::from(view)))
}

/// POST /cart/items
///
/// Adds a product, merging with an existing line for the same product. The
/// resulting quantity must not exceed the product's stock.
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or insufficient stock"),
        (status = 404, description = "Product not found"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let AddItemRequest {
        product_id,
        quantity,
    } = body.into_inner();
    let carts = state.carts.clone();
    let view = web::block(move || carts.add_item(actor.user_id, product_id, quantity)).await??;
    Ok(ok(CartResponse::from(view)))
}

/// PATCH /cart/items/{item_id}
#[utoipa::path(
    patch,
    path = "/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line UUID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or insufficient stock"),
        (status = 404, description = "Cart item not found"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    body: web::Json<UpdateItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let quantity = body.quantity;
    let carts = state.carts.clone();
    let view =
        web::block(move || carts.update_item(actor.user_id, item_id, quantity)).await??;
    Ok(ok(CartResponse::from(view)))
}

/// DELETE /cart/items/{item_id}
#[utoipa::path(
    delete,
    path = "/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line UUID")),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart item not found"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let carts = state.carts.clone();
    let view = web::block(move || carts.remove_item(actor.user_id, item_id)).await??;
    Ok(ok(CartResponse::from(view)))
}

/// DELETE /cart
#[utoipa::path(
    delete,
    path = "/cart",
    responses((status = 200, description = "Emptied cart", body = CartResponse)),
    tag = "cart"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    actor: Actor,
) -> Result<HttpResponse, AppError> {
    let carts = state.carts.clone();
    let view = web::block(move || carts.clear(actor.user_id)).await??;
    Ok(ok(CartResponse::from(view)))
}
