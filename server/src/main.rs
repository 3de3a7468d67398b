use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use seckill_server::clock::{Clock, SystemClock};
use seckill_server::config::Config;
use seckill_server::engine::ExpiryReaper;
use seckill_server::routes::create_routes;
use seckill_server::state::AppState;
use seckill_server::store::{InventoryStore, OrderStore, PgStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let store = PgStore::new(pool);
    let inventory: Arc<dyn InventoryStore> = Arc::new(store.clone());
    let orders: Arc<dyn OrderStore> = Arc::new(store);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = config.engine_settings();

    let reaper = config.reaper_interval().map(|interval| {
        ExpiryReaper::new(
            inventory.clone(),
            orders.clone(),
            clock.clone(),
            settings,
            config.reaper_batch_size,
        )
        .spawn(interval)
    });
    if reaper.is_none() {
        tracing::warn!("Expiry reaper disabled; abandoned reservations will hold stock");
    }

    let state = AppState::new(inventory, orders, clock, settings);
    let app = create_routes(state, &config.cors_allowed_origins);

    tracing::info!("Server running at http://{}", config.server_addr);

    let listener = TcpListener::bind(config.server_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");

    if let Some(reaper) = reaper {
        reaper.abort();
    }
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
