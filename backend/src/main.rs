//! # Token Price Cache Service
//!
//! Thin entry point: loads configuration, wires the engine's collaborators,
//! runs `initPriceCache` once, starts the periodic update loop, and serves
//! the read API.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use backend::config::EngineConfig;
use backend::engine::CacheEngine;
use backend::handlers::get_price;
use backend::stellar::horizon::HorizonClient;
use backend::store::RedisPriceStore;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = EngineConfig::from_env()?;
    config.validate()?;

    let store = Arc::new(RedisPriceStore::connect(&config.redis_url).await?);
    let chain = Arc::new(HorizonClient::new(config.horizon_url.clone()));
    let engine = Arc::new(CacheEngine::new(&config, store, chain));

    if let Err(e) = engine.init_price_cache().await {
        error!(error = %e, "initial catalog bootstrap failed");
    }

    tokio::spawn({
        let engine = engine.clone();
        async move {
            loop {
                if let Err(e) = engine.update_prices().await {
                    error!(error = %e, "update_prices pass failed");
                }
                tokio::time::sleep(Duration::from_millis(config.batch_update_delay_ms)).await;
            }
        }
    });

    let app = Router::new()
        .route("/prices/:token", get(get_price))
        .with_state(engine);

    let bind_address = "127.0.0.1:3001";
    info!(bind_address, "starting token price cache service");
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
