use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    backend::{BackendFactory, DataSource, HttpBackendFactory},
    config::Configuration,
    metrics, PodMonitorError, Result,
};

pub mod monitor;

/// Shared, read-only state of the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<dyn BackendFactory>,
    pub source: DataSource,
    pub query_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            factory: Arc::new(HttpBackendFactory::new(config.prometheus.query_timeout)),
            source: config.data_source(),
            query_timeout: config.prometheus.query_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/clusters/:cluster/namespaces/:namespace/pods/:pod/monitor",
            get(monitor::monitor_handler),
        )
        .route(
            "/api/v1/clusters/:cluster/namespaces/:namespace/pods/:pod/metrics",
            get(monitor::metrics_handler),
        )
        .route("/healthz", get(health))
        .route("/internal/metrics", get(telemetry))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn telemetry() -> impl IntoResponse {
    match metrics::gather() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => {
            error!("Encode telemetry failed: {}", e);
            PodMonitorError::Internal(e.to_string()).into_response()
        }
    }
}

pub async fn start_server(config: Configuration) -> Result<()> {
    metrics::init_metrics();
    let app = router(AppState::from_config(&config));

    let addr = config.server.listen_addr.as_str();
    info!(
        "Starting pod monitor on {}, proxying to {}",
        addr, config.prometheus.url
    );

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        PodMonitorError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PodMonitorError::Internal(format!("Server error: {}", e)))?;

    info!("Pod monitor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
