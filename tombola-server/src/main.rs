//! Tombola Draw Server
//!
//! Serves the HTTP API and the real-time WebSocket channel over one shared
//! draw state.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tombola::{
    network::router, HistoryStore, JsonFileHistoryStore, MemoryHistoryStore, RealtimeServer,
    ServerConfig, SyncHub, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tombola=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    info!("Tombola Server v{}", VERSION);
    info!("HTTP API: {}", config.api_addr);
    info!("Real-time: {}", config.realtime_addr);

    let history: Arc<dyn HistoryStore> = match &config.history_path {
        Some(path) => {
            let store = JsonFileHistoryStore::new(path.clone());
            info!("History file: {}", store.path().display());
            Arc::new(store)
        }
        None => {
            info!("History kept in memory");
            Arc::new(MemoryHistoryStore::new())
        }
    };

    let hub = Arc::new(SyncHub::new(history, config.session_buffer));
    let realtime = Arc::new(RealtimeServer::new(config.realtime(), hub.clone()));

    // Both listeners bind up front; the process never runs without either.
    let realtime_listener = realtime
        .bind()
        .await
        .with_context(|| format!("failed to bind {}", config.realtime_addr))?;
    let listener = TcpListener::bind(config.api_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.api_addr))?;

    let realtime_task = {
        let realtime = realtime.clone();
        tokio::spawn(async move {
            if let Err(e) = realtime.serve(realtime_listener).await {
                error!("Real-time server failed: {}", e);
            }
        })
    };

    let shutdown = {
        let realtime = realtime.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("Shutting down");
            realtime.shutdown();
        }
    };

    axum::serve(listener, router(hub))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    realtime.shutdown();
    let _ = realtime_task.await;
    info!("Server stopped");
    Ok(())
}
