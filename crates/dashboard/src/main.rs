use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use persistence::{
    DataStore, HttpObjectStorage, MemoryObjectStorage, MemoryStore, ObjectStorage, PgStore,
};
use playtime_dashboard::{
    app,
    config::{self, StoreBackend},
    middleware,
};
use tracing::{info, warn};

const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting Playtime admin API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn DataStore> = match config.database.backend {
        StoreBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_config()).await?;
            info!("Running database migrations...");
            persistence::db::run_migrations(&pool).await?;
            info!("Migrations completed");
            spawn_pool_metrics(pool.clone());
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let storage: Arc<dyn ObjectStorage> = if config.storage.base_url.is_empty() {
        warn!("Object storage is not configured; documents are kept in memory");
        Arc::new(MemoryObjectStorage::new())
    } else {
        Arc::new(HttpObjectStorage::new(
            &config.storage.base_url,
            &config.storage.service_key,
            Duration::from_secs(config.storage.timeout_secs),
        )?)
    };

    let addr = config.socket_addr()?;
    let app = app::create_app(config, store, storage);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Publishes connection pool gauges every [`POOL_METRICS_INTERVAL`].
fn spawn_pool_metrics(pool: sqlx::PgPool) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(POOL_METRICS_INTERVAL);
        loop {
            ticker.tick().await;
            persistence::metrics::record_pool_metrics(&pool);
        }
    });
}
