//! Docbridge Server - HTTP test API for the document model and cache.

use std::sync::Arc;

use docbridge_engine::{Database, Dispatcher, Services, WritePool};
use docbridge_server::config::Config;
use docbridge_server::{cache, create_app, db, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "docbridge_server=debug,docbridge_engine=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Docbridge Server on {}:{}", config.host, config.port);

    let pool = Arc::new(WritePool::new(
        config.write_workers,
        config.write_queue_capacity,
    )?);

    // The drivers block while resolving their servers
    let services = {
        let config = config.clone();
        let pool = Arc::clone(&pool);
        tokio::task::spawn_blocking(move || -> docbridge_engine::Result<Services> {
            let store = db::connect(&config.database_url, &config.database_name)?;
            let cache = cache::connect(config.redis_url.as_deref())?;
            let db = Database::new(&config.database_name, store, pool);

            let check = db.check_connection();
            if check.status {
                tracing::info!(collections = ?check.collections, "{}", check.message);
            } else {
                tracing::warn!("{}", check.message);
            }
            if let Some(cache) = &cache {
                let check = cache.check_connection();
                if check.status {
                    tracing::info!("{}", check.message);
                } else {
                    tracing::warn!("{}", check.message);
                }
            }

            Ok(Services::new(db, cache))
        })
        .await??
    };

    let addr = format!("{}:{}", config.host, config.port);
    let app = create_app(AppState::new(Dispatcher::new(services), config));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let queued detached writes finish
    tracing::info!("Draining write pool");
    tokio::task::spawn_blocking(move || pool.shutdown()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
