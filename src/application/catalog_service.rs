use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CacheProvider, ProductRepository};
use crate::domain::product::{Category, NewProduct, Page, PageRequest, Product, ProductUpdate};

use super::side_effects::{product_cache_key, SideEffects};

/// Product reads and admin writes. Reads go through the cache under
/// `product:{id}`; every write schedules an invalidation of that key.
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    cache: Arc<dyn CacheProvider>,
    cache_ttl: Duration,
    effects: SideEffects,
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        cache: Arc<dyn CacheProvider>,
        cache_ttl: Duration,
        effects: SideEffects,
    ) -> Self {
        Self {
            products,
            cache,
            cache_ttl,
            effects,
        }
    }

    pub fn get(&self, id: Uuid) -> Result<Product, DomainError> {
        let key = product_cache_key(id);
        match self.cache.get(&key) {
            Ok(Some(cached)) => match serde_json::from_str::<Product>(&cached) {
                Ok(product) => return Ok(product),
                Err(e) => log::warn!("discarding unreadable cache entry {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("cache read for {} failed: {}", key, e),
        }

        let read_at = Instant::now();
        let product = self
            .products
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("Product"))?;

        match serde_json::to_string(&product) {
            Ok(json) => {
                if let Err(e) = self.cache.set(&key, json, self.cache_ttl, read_at) {
                    log::warn!("cache write for {} failed: {}", key, e);
                }
            }
            Err(e) => log::warn!("could not serialize product {}: {}", id, e),
        }
        Ok(product)
    }

    pub fn list(
        &self,
        page: PageRequest,
        category: Option<Category>,
    ) -> Result<Page<Product>, DomainError> {
        self.products.list(page, category)
    }

    pub fn create(&self, actor: &Actor, product: NewProduct) -> Result<Product, DomainError> {
        actor.require_admin()?;
        product.validate()?;
        let product = self.products.create(product)?;
        log::info!("product {} created by {}", product.id, actor.user_id);
        Ok(product)
    }

    pub fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Product, DomainError> {
        actor.require_admin()?;
        update.validate()?;
        let product = self
            .products
            .update(id, update)?
            .ok_or_else(|| DomainError::not_found("Product"))?;
        self.effects.invalidate(product_cache_key(id));
        Ok(product)
    }

    pub fn adjust_stock(&self, actor: &Actor, id: Uuid, delta: i32) -> Result<Product, DomainError> {
        actor.require_admin()?;
        let product = self.products.adjust_stock(id, delta)?;
        self.effects.invalidate(product_cache_key(id));
        log::info!(
            "stock of product {} adjusted by {} to {}",
            id,
            delta,
            product.stock
        );
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use bigdecimal::BigDecimal;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::application::side_effects::SideEffect;
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::memory::InMemoryStore;

    fn service() -> (CatalogService, Arc<InMemoryCache>, UnboundedReceiver<SideEffect>) {
        let cache = Arc::new(InMemoryCache::new());
        let (effects, rx) = SideEffects::channel();
        let service = CatalogService::new(
            Arc::new(InMemoryStore::new()),
            cache.clone(),
            Duration::from_secs(60),
            effects,
        );
        (service, cache, rx)
    }

    fn new_product(stock: i32) -> NewProduct {
        NewProduct {
            name: "Headphones".to_string(),
            description: "Over-ear".to_string(),
            category: Category::Electronics,
            price: BigDecimal::from(250_000),
            discount_percentage: 10,
            stock,
            weight_grams: None,
        }
    }

    fn admin() -> Actor {
        Actor::admin(Uuid::new_v4())
    }

    #[test]
    fn create_requires_admin() {
        let (service, _, _) = service();
        let err = service
            .create(&Actor::customer(Uuid::new_v4()), new_product(1))
            .expect_err("customers cannot create products");
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn create_rejects_negative_stock() {
        let (service, _, _) = service();
        let err = service
            .create(&admin(), new_product(-1))
            .expect_err("negative stock");
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn get_populates_the_cache() {
        let (service, cache, _) = service();
        let product = service.create(&admin(), new_product(3)).expect("create");

        let fetched = service.get(product.id).expect("get");

        assert_eq!(fetched, product);
        let cached = cache
            .get(&product_cache_key(product.id))
            .expect("cache read")
            .expect("entry present");
        let cached: Product = serde_json::from_str(&cached).expect("valid json");
        assert_eq!(cached, product);
    }

    #[test]
    fn get_missing_product_is_not_found() {
        let (service, _, _) = service();
        assert_eq!(
            service.get(Uuid::new_v4()),
            Err(DomainError::not_found("Product"))
        );
    }

    #[test]
    fn adjust_stock_never_goes_negative_and_schedules_invalidation() {
        let (service, _, mut rx) = service();
        let product = service.create(&admin(), new_product(5)).expect("create");

        let err = service
            .adjust_stock(&admin(), product.id, -6)
            .expect_err("would go negative");
        assert!(matches!(err, DomainError::InvalidArgument(_)));

        let updated = service
            .adjust_stock(&admin(), product.id, -5)
            .expect("adjust");
        assert_eq!(updated.stock, 0);
        assert_eq!(
            rx.try_recv().ok(),
            Some(SideEffect::InvalidateCache(product_cache_key(product.id)))
        );
    }

    #[test]
    fn update_applies_fields_and_missing_product_is_not_found() {
        let (service, _, _) = service();
        let product = service.create(&admin(), new_product(5)).expect("create");

        let updated = service
            .update(
                &admin(),
                product.id,
                ProductUpdate {
                    price: Some(BigDecimal::from(199_000)),
                    ..ProductUpdate::default()
                },
            )
            .expect("update");
        assert_eq!(updated.price, BigDecimal::from(199_000));
        assert_eq!(updated.name, product.name);

        let err = service
            .update(&admin(), Uuid::new_v4(), ProductUpdate::default())
            .expect_err("missing");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    /// Commits a stock change and invalidates the product while a read is in flight.
    struct RacingProducts {
        inner: InMemoryStore,
        cache: Arc<InMemoryCache>,
        raced: AtomicBool,
    }

    impl ProductRepository for RacingProducts {
        fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
            ProductRepository::create(&self.inner, product)
        }

        fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
            let seen = ProductRepository::find_by_id(&self.inner, id)?;
            if !self.raced.swap(true, Ordering::SeqCst) {
                ProductRepository::adjust_stock(&self.inner, id, -3)?;
                self.cache
                    .invalidate(&product_cache_key(id))
                    .expect("invalidate");
            }
            Ok(seen)
        }

        fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
            ProductRepository::find_many(&self.inner, ids)
        }

        fn list(
            &self,
            page: PageRequest,
            category: Option<Category>,
        ) -> Result<Page<Product>, DomainError> {
            ProductRepository::list(&self.inner, page, category)
        }

        fn update(&self, id: Uuid, update: ProductUpdate) -> Result<Option<Product>, DomainError> {
            ProductRepository::update(&self.inner, id, update)
        }

        fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Product, DomainError> {
            ProductRepository::adjust_stock(&self.inner, id, delta)
        }
    }

    #[test]
    fn read_overtaken_by_invalidation_is_not_cached() {
        let store = InMemoryStore::new();
        let cache = Arc::new(InMemoryCache::new());
        let product = ProductRepository::create(&store, new_product(5)).expect("seed");
        let (effects, _rx) = SideEffects::channel();
        let service = CatalogService::new(
            Arc::new(RacingProducts {
                inner: store,
                cache: cache.clone(),
                raced: AtomicBool::new(false),
            }),
            cache.clone(),
            Duration::from_secs(60),
            effects,
        );

        let served = service.get(product.id).expect("get");

        assert_eq!(served.stock, 5);
        assert_eq!(cache.get(&product_cache_key(product.id)), Ok(None));
        assert_eq!(service.get(product.id).expect("get").stock, 2);
    }
}
