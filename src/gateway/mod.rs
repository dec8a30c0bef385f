mod handlers;

use crate::config::GatewayConfig;
use crate::ledger::LedgerStore;
use anyhow::Context;
use axum::{Router, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

/// Shared state for the read-only HTTP view.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/urllog/{channel}", get(handlers::handle_channel_log))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .with_state(state)
}

/// Serve the HTTP view until the process exits.
pub async fn serve(config: &GatewayConfig, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind gateway on {addr}"))?;

    tracing::info!("gateway listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
