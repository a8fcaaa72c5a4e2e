use crate::utils::SystemMetrics;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::{encoding::text::encode, registry::Registry};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::info;

#[derive(Clone)]
pub struct MetricsServerState {
    pub registry: Arc<Registry>,
    pub system_metrics: Arc<SystemMetrics>,
}

pub async fn metrics_handler(State(state): State<MetricsServerState>) -> impl IntoResponse {
    let mut buffer = String::new();

    match encode(&mut buffer, &state.registry) {
        Ok(()) => Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )
            .body(Body::from(buffer))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn usage_handler(State(state): State<MetricsServerState>) -> impl IntoResponse {
    Json(state.system_metrics.usage())
}

pub fn metrics_router(state: MetricsServerState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/usage", get(usage_handler))
        .with_state(state)
}

/// Serves `/metrics` and `/usage` until the shutdown channel fires.
pub async fn serve_metrics(
    addr: SocketAddr,
    state: MetricsServerState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server on {addr}"))?;

    info!("📈 Metrics server listening on {addr}");

    axum::serve(listener, metrics_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .context("Metrics server failed")
}
