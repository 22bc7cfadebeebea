pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::catalog_service::CatalogService;
use application::coupon_service::CouponService;
use application::order_service::OrderService;
use application::side_effects::SideEffects;
use domain::ports::{
    CacheProvider, CartRepository, CouponRepository, OrderRepository, ProductRepository,
};
use errors::AppError;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::coupon_repo::DieselCouponRepository;
use infrastructure::memory::InMemoryStore;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_repo::DieselProductRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("applied {} pending migration(s)", applied.len());
    Ok(())
}

/// The four persistence ports every service is built from.
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Repositories {
    pub fn diesel(pool: DbPool) -> Self {
        Self {
            products: Arc::new(DieselProductRepository::new(pool.clone())),
            carts: Arc::new(DieselCartRepository::new(pool.clone())),
            coupons: Arc::new(DieselCouponRepository::new(pool.clone())),
            orders: Arc::new(DieselOrderRepository::new(pool)),
        }
    }

    pub fn in_memory(store: InMemoryStore) -> Self {
        Self {
            products: Arc::new(store.clone()),
            carts: Arc::new(store.clone()),
            coupons: Arc::new(store.clone()),
            orders: Arc::new(store),
        }
    }
}

/// Services shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub carts: CartService,
    pub coupons: CouponService,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        cache: Arc<dyn CacheProvider>,
        cache_ttl: Duration,
        effects: SideEffects,
    ) -> Self {
        Self {
            catalog: CatalogService::new(
                repos.products.clone(),
                cache,
                cache_ttl,
                effects.clone(),
            ),
            carts: CartService::new(
                repos.carts.clone(),
                repos.products.clone(),
                repos.coupons.clone(),
            ),
            coupons: CouponService::new(repos.coupons.clone()),
            orders: OrderService::new(
                repos.orders,
                repos.carts,
                repos.products,
                repos.coupons,
                effects,
            ),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::adjust_stock,
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::coupons::apply_coupon,
        handlers::coupons::remove_coupon,
        handlers::coupons::create_coupon,
        handlers::coupons::list_coupons,
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_status,
        handlers::orders::cancel_order,
        handlers::orders::confirm_delivery,
        handlers::orders::update_payment,
    ),
    tags(
        (name = "products", description = "Product catalog"),
        (name = "cart", description = "The caller's shopping cart"),
        (name = "coupons", description = "Discount coupons"),
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Registers every route plus the extractor configs that turn malformed
/// input into 400 responses with the error envelope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(handlers::health::health))
    .service(
        web::scope("/products")
            .route("", web::get().to(handlers::products::list_products))
            .route("", web::post().to(handlers::products::create_product))
            .route("/{id}", web::get().to(handlers::products::get_product))
            .route("/{id}", web::patch().to(handlers::products::update_product))
            .route("/{id}/stock", web::patch().to(handlers::products::adjust_stock)),
    )
    .service(
        web::scope("/cart")
            .route("", web::get().to(handlers::cart::get_cart))
            .route("", web::delete().to(handlers::cart::clear_cart))
            .route("/items", web::post().to(handlers::cart::add_item))
            .route("/items/{item_id}", web::patch().to(handlers::cart::update_item))
            .route("/items/{item_id}", web::delete().to(handlers::cart::remove_item)),
    )
    .service(
        web::scope("/coupons")
            .route("", web::get().to(handlers::coupons::list_coupons))
            .route("", web::post().to(handlers::coupons::create_coupon))
            .route("/apply", web::post().to(handlers::coupons::apply_coupon))
            .route("/apply", web::delete().to(handlers::coupons::remove_coupon)),
    )
    .service(
        web::scope("/orders")
            .route("", web::post().to(handlers::orders::create_order))
            .route("", web::get().to(handlers::orders::list_orders))
            .route("/{id}", web::get().to(handlers::orders::get_order))
            .route("/{id}/status", web::patch().to(handlers::orders::update_status))
            .route("/{id}/cancel", web::patch().to(handlers::orders::cancel_order))
            .route("/{id}/deliver", web::patch().to(handlers::orders::confirm_delivery))
            .route("/{id}/payment", web::patch().to(handlers::orders::update_payment)),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
            .configure(configure)
    })
    .bind((host.to_string(), port))?
    .run())
}
