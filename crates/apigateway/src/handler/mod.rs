mod order;
mod resource;

use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{Json, extract::DefaultBodyLimit, routing::get};
use shared::utils::{MetricsServerState, metrics_router};
use std::net::SocketAddr;
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

pub use self::order::{order_routes, transition_order};
pub use self::resource::{
    create_resource, delete_resource, get_resource, list_resources, resource_routes,
    update_resource,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        resource::list_resources,
        resource::get_resource,
        resource::create_resource,
        resource::update_resource,
        resource::delete_resource,

        order::transition_order,
    ),
    tags(
        (name = "Resource", description = "Users, products and orders, routed to their owning service"),
        (name = "Order", description = "Order lifecycle"),
    )
)]
struct ApiDoc;

pub struct AppRouter;

impl AppRouter {
    pub async fn serve(
        port: u16,
        app_state: AppState,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let api_router = OpenApiRouter::with_openapi(ApiDoc::openapi())
            .merge(order_routes(app_state.routing.clone()))
            .merge(resource_routes(app_state.routing.clone()));

        let router_with_layers = api_router
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024));

        let (app_router, api) = router_with_layers.split_for_parts();

        let metrics_state = MetricsServerState {
            registry: app_state.registry.clone(),
            system_metrics: app_state.system_metrics.clone(),
        };

        let app = app_router
            .route(
                "/api-docs/openapi.json",
                get(move || {
                    let api = api.clone();
                    async move { Json(api) }
                }),
            )
            .merge(metrics_router(metrics_state));

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind gateway on {addr}"))?;

        info!("🚀 Gateway running on http://{}", listener.local_addr()?);
        info!("📖 OpenAPI document: http://localhost:{port}/api-docs/openapi.json");
        info!("📊 Metrics: http://localhost:{port}/metrics");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Gateway received shutdown signal");
            })
            .await
            .context("Gateway server failed")?;

        Ok(())
    }
}
