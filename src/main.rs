use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use storefront_service::application::side_effects::{self, SideEffects};
use storefront_service::config::Config;
use storefront_service::domain::ports::{CacheProvider, Notifier};
use storefront_service::infrastructure::cache::{InMemoryCache, NoopCache};
use storefront_service::infrastructure::notifier::{LogNotifier, NoopNotifier};
use storefront_service::{build_server, create_pool, run_migrations, AppState, Repositories};

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    let pool = create_pool(&config.database_url, config.db_pool_size)
        .map_err(|e| startup_error("failed to create database pool", e))?;
    run_migrations(&pool).map_err(|e| startup_error("failed to run migrations", e))?;

    let cache: Arc<dyn CacheProvider> = if config.cache_enabled {
        Arc::new(InMemoryCache::new())
    } else {
        log::info!("product cache disabled");
        Arc::new(NoopCache)
    };
    let notifier: Arc<dyn Notifier> = if config.notifications_enabled {
        Arc::new(LogNotifier)
    } else {
        log::info!("notifications disabled");
        Arc::new(NoopNotifier)
    };

    let (effects, effects_rx) = SideEffects::channel();
    let worker = tokio::spawn(side_effects::run(effects_rx, cache.clone(), notifier));

    let state = AppState::new(
        Repositories::diesel(pool),
        cache,
        config.cache_ttl,
        effects,
    );

    log::info!("Starting server at http://{}", config.addr());

    build_server(state, &config.host, config.port)?.await?;

    // Give queued effects a moment to drain once the workers have stopped.
    match tokio::time::timeout(SHUTDOWN_DRAIN, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("side-effect worker ended abnormally: {}", e),
        Err(_) => log::warn!("side-effect queue not drained after {:?}", SHUTDOWN_DRAIN),
    }
    Ok(())
}
