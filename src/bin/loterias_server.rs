//! Lottery results server.
//!
//! Serves stored results over HTTP and keeps them in sync with the upstream
//! on a schedule.
//!
//! ## Usage
//!
//! ```bash
//! # In-memory store
//! cargo run --bin loterias_server --features server
//!
//! # Postgres store and headless-browser fallback
//! DATABASE_URL=postgresql://localhost/loterias \
//!   cargo run --bin loterias_server --features server,database,browser
//!
//! curl http://localhost:9050/api/megasena/latest
//! curl -X POST http://localhost:9050/admin/update/quina
//! curl http://localhost:9050/admin/block
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use loterias_sync::admin::AdminService;
use loterias_sync::api::{create_router, ApiState};
use loterias_sync::config::AppConfig;
use loterias_sync::reconcile::{LotteryUpdater, UpdatePolicy};
use loterias_sync::scheduler::UpdateScheduler;
use loterias_sync::store::{MemoryResultStore, ResultStore};
use loterias_sync::upstream::{BlockGate, RenderSession, ResilientFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("starting loterias server");

    let store = connect_store(&config).await?;
    let gate = Arc::new(BlockGate::new());
    let fetcher = Arc::new(ResilientFetcher::with_defaults(Arc::clone(&gate), render_session())?);

    let updater = Arc::new(LotteryUpdater::new(
        fetcher.clone(),
        Arc::clone(&store),
        UpdatePolicy::default(),
    ));
    let admin = AdminService::new(Arc::clone(&updater), Arc::clone(&gate));
    let scheduler = UpdateScheduler::new(Arc::clone(&updater), config.cron_schedule.as_deref())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let app = create_router(ApiState { store, admin })
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_task.await {
        tracing::warn!(error = %e, "scheduler task ended abnormally");
    }
    fetcher.shutdown().await;
    tracing::info!("server stopped");
    Ok(())
}

#[cfg(feature = "database")]
async fn connect_store(config: &AppConfig) -> Result<Arc<dyn ResultStore>> {
    match &config.database_url {
        Some(url) => {
            let store = loterias_sync::store::PgResultStore::connect(url).await?;
            tracing::info!("using postgres result store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, results are kept in memory");
            Ok(Arc::new(MemoryResultStore::new()))
        }
    }
}

#[cfg(not(feature = "database"))]
async fn connect_store(config: &AppConfig) -> Result<Arc<dyn ResultStore>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the database feature is disabled, using memory store");
    }
    Ok(Arc::new(MemoryResultStore::new()))
}

#[cfg(feature = "browser")]
fn render_session() -> RenderSession {
    RenderSession::new(Arc::new(loterias_sync::upstream::render::ChromeLauncher))
}

#[cfg(not(feature = "browser"))]
fn render_session() -> RenderSession {
    tracing::warn!("browser feature disabled, rendering fallback unavailable");
    RenderSession::disabled()
}
