use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::domain::order::{
    CheckoutRequest, Order, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::domain::pricing::ShippingMethod;
use crate::domain::product::PageRequest;
use crate::errors::AppError;
use crate::AppState;

use super::{created, money, ok, timestamp, PageParams};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressBody {
    pub recipient_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub province: String,
    pub postal_code: String,
}

impl From<ShippingAddressBody> for ShippingAddress {
    fn from(a: ShippingAddressBody) -> Self {
        Self {
            recipient_name: a.recipient_name,
            phone: a.phone,
            street: a.street,
            city: a.city,
            province: a.province,
            postal_code: a.postal_code,
        }
    }
}

impl From<ShippingAddress> for ShippingAddressBody {
    fn from(a: ShippingAddress) -> Self {
        Self {
            recipient_name: a.recipient_name,
            phone: a.phone,
            street: a.street,
            city: a.city,
            province: a.province,
            postal_code: a.postal_code,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: ShippingAddressBody,
    /// bank_transfer, credit_card, e_wallet or cash_on_delivery
    pub payment_method: String,
    /// regular or express
    pub shipping_method: String,
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    fn into_domain(self) -> Result<CheckoutRequest, AppError> {
        Ok(CheckoutRequest {
            payment_method: self.payment_method.parse::<PaymentMethod>()?,
            shipping_method: self.shipping_method.parse::<ShippingMethod>()?,
            shipping_address: self.shipping_address.into(),
            notes: self.notes,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub discount_percentage: i32,
    pub weight_grams: i32,
    pub line_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryResponse {
    pub status: String,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub shipping_method: String,
    pub shipping_address: ShippingAddressBody,
    pub notes: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub coupon_code: Option<String>,
    pub coupon_discount: String,
    pub total_weight: i32,
    pub items_price: String,
    pub shipping_price: String,
    pub tax_price: String,
    pub total_price: String,
    pub status_history: Vec<StatusHistoryResponse>,
    pub paid_at: Option<String>,
    pub delivered_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            status: o.status.to_string(),
            payment_status: o.payment_status.to_string(),
            payment_method: o.payment_method.to_string(),
            shipping_method: o.shipping_method.to_string(),
            shipping_address: o.shipping_address.into(),
            notes: o.notes,
            items: o
                .items
                .iter()
                .map(|i| OrderItemResponse {
                    id: i.id,
                    product_id: i.product_id,
                    name: i.name.clone(),
                    quantity: i.quantity,
                    unit_price: money(&i.unit_price),
                    discount_percentage: i.discount_percentage,
                    weight_grams: i.weight_grams,
                    line_total: money(&i.line_total()),
                })
                .collect(),
            coupon_code: o.coupon_code,
            coupon_discount: money(&o.coupon_discount),
            total_weight: o.total_weight,
            items_price: money(&o.prices.items_price),
            shipping_price: money(&o.prices.shipping_price),
            tax_price: money(&o.prices.tax_price),
            total_price: money(&o.prices.total_price),
            status_history: o
                .history
                .into_iter()
                .map(|h| StatusHistoryResponse {
                    status: h.status.to_string(),
                    actor_id: h.actor_id,
                    note: h.note,
                    at: timestamp(&h.at),
                })
                .collect(),
            paid_at: o.paid_at.as_ref().map(timestamp),
            delivered_at: o.delivered_at.as_ref().map(timestamp),
            cancelled_at: o.cancelled_at.as_ref().map(timestamp),
            created_at: timestamp(&o.created_at),
            updated_at: timestamp(&o.updated_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentUpdateRequest {
    /// paid, failed or refunded
    pub status: String,
    pub note: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Checks out the caller's cart. The order, the stock reservation, the coupon
/// usage, the emptied cart and an outbox event are committed together.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Empty cart, insufficient stock or invalid input"),
        (status = 404, description = "A product in the cart no longer exists"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner().into_domain()?;
    let orders = state.orders.clone();

    let order = web::block(move || orders.checkout(&actor, request))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(created(OrderResponse::from(order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();
    let order = web::block(move || orders.get(&actor, order_id)).await??;
    Ok(ok(OrderResponse::from(order)))
}

/// GET /orders
///
/// Returns the caller's orders newest first; admins see every order.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 400, description = "Invalid pagination"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::new(query.page, query.limit)?;
    let orders = state.orders.clone();
    let result = web::block(move || orders.list(&actor, page)).await??;

    Ok(ok(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page: page.page,
        limit: page.limit,
    }))
}

/// PATCH /orders/{id}/status
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Illegal transition"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let UpdateStatusRequest { status, note } = body.into_inner();
    let status = status.parse::<OrderStatus>()?;
    let orders = state.orders.clone();
    let order =
        web::block(move || orders.update_status(&actor, order_id, status, note)).await??;
    Ok(ok(OrderResponse::from(order)))
}

/// PATCH /orders/{id}/cancel
///
/// Cancels a pending or processing order and returns its items to stock.
#[utoipa::path(
    patch,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body(content = CancelOrderRequest, description = "Optional cancellation reason"),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 400, description = "Order can no longer be cancelled"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    body: Option<web::Json<CancelOrderRequest>>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let reason = body.and_then(|b| b.into_inner().reason);
    let orders = state.orders.clone();
    let order = web::block(move || orders.cancel(&actor, order_id, reason)).await??;
    Ok(ok(OrderResponse::from(order)))
}

/// PATCH /orders/{id}/deliver
///
/// The owner confirms a shipped order has arrived.
#[utoipa::path(
    patch,
    path = "/orders/{id}/deliver",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order delivered", body = OrderResponse),
        (status = 400, description = "Order is not shipped"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn confirm_delivery(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();
    let order = web::block(move || orders.confirm_delivery(&actor, order_id)).await??;
    Ok(ok(OrderResponse::from(order)))
}

/// PATCH /orders/{id}/payment
#[utoipa::path(
    patch,
    path = "/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = PaymentUpdateRequest,
    responses(
        (status = 200, description = "Payment status recorded", body = OrderResponse),
        (status = 400, description = "Payment outcome not allowed in the current state"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_payment(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    body: web::Json<PaymentUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let PaymentUpdateRequest { status, note } = body.into_inner();
    let outcome = status.parse::<PaymentStatus>()?;
    let orders = state.orders.clone();
    let order =
        web::block(move || orders.record_payment(&actor, order_id, outcome, note)).await??;
    Ok(ok(OrderResponse::from(order)))
}
