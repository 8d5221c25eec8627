//! # Hourglass API Server
//!
//! Serves the REST API under `/api` and, when `STATIC_DIR` is set, the web
//! client for every other path.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/hourglass \
//! JWT_SECRET=change-me-to-something-at-least-32-bytes \
//! cargo run -p hourglass-api
//! ```
//!
//! Set `LOG_FORMAT=json` for structured logs and `RUST_LOG` to override the
//! default filter.

use anyhow::Context;
use hourglass_api::{
    app::{build_router, AppState},
    bootstrap,
    config::Config,
};
use hourglass_shared::db::{
    migrations::{ensure_database_exists, run_migrations},
    pool::{close_pool, create_pool},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hourglass_api=debug,hourglass_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Hourglass API v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    ensure_database_exists(&config.database.url)
        .await
        .context("Failed to create database")?;
    let pool = create_pool(config.pool_config())
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap::ensure_admin(&pool, admin).await?;
    }

    let address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!("Listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");
    Ok(())
}
