use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use grenades_api::build_router;
use grenades_api::cache::{ResponseCache, spawn_sweeper};
use grenades_api::config::AppConfig;
use grenades_api::database::init_db;
use grenades_api::middleware::rate_limit::{RateLimiter, spawn_cleanup_task};
use grenades_api::server::{self, shutdown_signal};
use grenades_api::state::{AppState, build_image_store};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    let image_store = build_image_store(&config.storage)
        .await
        .context("Failed to initialise image storage")?;

    let tracker = TaskTracker::new();
    let shutdown = CancellationToken::new();

    let cache = Arc::new(ResponseCache::from_config(&config.cache));
    if config.cache.enabled {
        spawn_sweeper(
            cache.clone(),
            Duration::from_secs(config.cache.cleanup_secs),
            &tracker,
            shutdown.clone(),
        );
    }

    let limiter = config
        .limiter
        .enabled
        .then(|| Arc::new(RateLimiter::from_config(&config.limiter)));
    if let Some(limiter) = &limiter {
        spawn_cleanup_task(limiter.clone(), &tracker, shutdown.clone());
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let environment = config.server.environment.clone();
    let state = AppState {
        db: db.clone(),
        image_store,
        cache,
        config,
    };
    let app = build_router(state, limiter);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, %environment, "Server listening");

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    server::serve(listener, app, shutdown.clone()).await?;

    shutdown.cancel();
    tracker.close();
    tracker.wait().await;

    db.close().await.context("Failed to close database pool")?;
    info!("Server stopped");
    Ok(())
}
