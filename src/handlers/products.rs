use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::domain::product::{Category, NewProduct, PageRequest, Product, ProductUpdate};
use crate::errors::AppError;
use crate::AppState;

use super::{created, money, ok, parse_money, timestamp};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub discount_percentage: i32,
    pub stock: i32,
    pub weight_grams: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            price: money(&p.price),
            category: p.category.to_string(),
            created_at: timestamp(&p.created_at),
            updated_at: timestamp(&p.updated_at),
            name: p.name,
            description: p.description,
            discount_percentage: p.discount_percentage,
            stock: p.stock,
            weight_grams: p.weight_grams,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListProductsParams {
    #[serde(default = "super::default_page")]
    pub page: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
    /// One of electronics, fashion, home, beauty, sports, books, food, other.
    pub category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    /// Decimal price as a string, e.g. "149000.00"
    pub price: String,
    #[serde(default)]
    pub discount_percentage: i32,
    pub stock: i32,
    pub weight_grams: Option<i32>,
}

impl CreateProductRequest {
    fn into_domain(self) -> Result<NewProduct, AppError> {
        Ok(NewProduct {
            price: parse_money("price", &self.price)?,
            category: self.category.parse::<Category>()?,
            name: self.name,
            description: self.description,
            discount_percentage: self.discount_percentage,
            stock: self.stock,
            weight_grams: self.weight_grams,
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub discount_percentage: Option<i32>,
    pub weight_grams: Option<i32>,
}

impl UpdateProductRequest {
    fn into_domain(self) -> Result<ProductUpdate, AppError> {
        Ok(ProductUpdate {
            price: self
                .price
                .map(|p| parse_money("price", &p))
                .transpose()?,
            category: self
                .category
                .map(|c| c.parse::<Category>())
                .transpose()?,
            name: self.name,
            description: self.description,
            discount_percentage: self.discount_percentage,
            weight_grams: self.weight_grams,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    /// Signed change applied to the current stock.
    pub delta: i32,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("category" = Option<String>, Query, description = "Only products of this category"),
    ),
    responses(
        (status = 200, description = "Paginated list of products", body = ListProductsResponse),
        (status = 400, description = "Invalid pagination or category"),
    ),
    tag = "products"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = PageRequest::new(params.page, params.limit)?;
    let category = params
        .category
        .map(|c| c.parse::<Category>())
        .transpose()?;

    let catalog = state.catalog.clone();
    let result = web::block(move || catalog.list(page, category)).await??;

    Ok(ok(ListProductsResponse {
        items: result.items.into_iter().map(ProductResponse::from).collect(),
        total: result.total,
        page: page.page,
        limit: page.limit,
    }))
}

/// GET /products/{id}
///
/// Served from the product cache when possible.
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let catalog = state.catalog.clone();
    let product = web::block(move || catalog.get(id)).await??;
    Ok(ok(ProductResponse::from(product)))
}

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product"),
        (status = 403, description = "Admin role required"),
    ),
    tag = "products"
)]
pub async fn create_product(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let product = body.into_inner().into_domain()?;
    let catalog = state.catalog.clone();
    let product = web::block(move || catalog.create(&actor, product)).await??;
    Ok(created(ProductResponse::from(product)))
}

/// PATCH /products/{id}
#[utoipa::path(
    patch,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid field value"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn update_product(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let update = body.into_inner().into_domain()?;
    let catalog = state.catalog.clone();
    let product = web::block(move || catalog.update(&actor, id, update)).await??;
    Ok(ok(ProductResponse::from(product)))
}

/// PATCH /products/{id}/stock
///
/// Applies a signed stock delta; the result can never drop below zero.
#[utoipa::path(
    patch,
    path = "/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ProductResponse),
        (status = 400, description = "Stock would become negative"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    body: web::Json<AdjustStockRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let delta = body.delta;
    let catalog = state.catalog.clone();
    let product = web::block(move || catalog.adjust_stock(&actor, id, delta)).await??;
    Ok(ok(ProductResponse::from(product)))
}
