use anyhow::{Context, Result};
use axum::Router;
use tokio::signal::unix::{signal, SignalKind};
use tokio::select;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::settings::{ServerConfig, SettingsConfig};
use crate::manager::TokenManager;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::{fallback_routes, proxy_routes};

#[derive(Clone)]
pub struct AppState {
    pub manager: TokenManager,
    pub metrics_state: MetricsState,
    pub server: ServerConfig,
}

impl AppState {
    pub fn new(manager: TokenManager, metrics: &Metrics, server: &ServerConfig) -> Self {
        Self {
            manager,
            metrics_state: MetricsState::new(metrics.registry.clone()),
            server: server.clone(),
        }
    }
}

/// All routes: `/api/*` proxy, `/metrics` when enabled, root redirect, `/404` and the catch-all.
pub fn router(state: AppState, settings_config: &SettingsConfig) -> Router {
    Router::new()
        .merge(proxy_routes::router())
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(fallback_routes::router())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub async fn start(settings_config: &SettingsConfig, manager: TokenManager) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState::new(manager, metrics, &settings_config.server);
    let app = router(state, settings_config);

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("bind {}", bind_addr))?;
    info!("listening on {}", bind_addr);

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    metrics.up.set(0);

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let (mut sigint, mut sigterm) = match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        _ => {
            tracing::error!("cannot install signal handlers, graceful shutdown disabled");
            return std::future::pending().await;
        }
    };
    select! {
        _ = sigint.recv() => info!("Received SIGINT (Ctrl+C). Initiating graceful shutdown..."),
        _ = sigterm.recv() => info!("Received SIGTERM. Initiating graceful shutdown..."),
    }
}
