use anyhow::{Context, Result};
use genproto::product::{
    product_command_service_server::ProductCommandServiceServer,
    product_query_service_server::ProductQueryServiceServer,
};
use product::{
    config::Config,
    handler::{ProductCommandGrpcServiceImpl, ProductQueryGrpcServiceImpl},
    state::AppState,
};
use shared::{
    config::{ConnectionPool, StoreBackend},
    utils::{MetricsServerState, Telemetry, init_logger, serve_metrics, shutdown_signal},
};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, state, telemetry) = setup().await.context("Failed to setup application")?;

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    let server_handle = run_servers(&config, state, shutdown_tx.clone());

    tokio::spawn(shutdown_signal(shutdown_tx));

    let _ = shutdown_rx.recv().await;
    info!("🛑 Shutdown signal received.");

    shutdown(telemetry, server_handle).await;

    Ok(())
}

async fn setup() -> Result<(Config, Arc<AppState>, Telemetry)> {
    dotenv::dotenv().ok();

    let config = Config::init().context("Failed to load configuration")?;

    let mut telemetry = Telemetry::new("product-service", config.telemetry.otel_endpoint.clone());
    let logger_provider = telemetry.init_logger()?;
    telemetry.init_meter()?;
    telemetry.init_tracer()?;

    init_logger(
        logger_provider,
        "product-service",
        config.telemetry.is_dev,
        config.telemetry.enable_file_log,
    );

    let store = StoreBackend::connect(&config.store)
        .await
        .context("Failed to initialize product store")?;

    if let StoreBackend::Postgres(pool) = &store
        && config.store.run_migrations
    {
        run_migrations(pool)
            .await
            .context("failed to migrate database")?;
    }

    let state = Arc::new(AppState::new(&store));

    info!("✅ Application setup completed successfully.");
    Ok((config, state, telemetry))
}

fn run_servers(
    config: &Config,
    state: Arc<AppState>,
    shutdown_tx: broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    let grpc_addr = config.server.grpc_addr();
    let metric_addr = config.server.metric_addr();

    let metrics_state = MetricsServerState {
        registry: state.registry.clone(),
        system_metrics: state.system_metrics.clone(),
    };
    let metrics_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = serve_metrics(metric_addr, metrics_state, metrics_shutdown).await {
            error!("Metrics server failed: {e:#}");
        }
    });

    tokio::spawn(async move {
        loop {
            info!("Attempting to start gRPC server on {grpc_addr}");

            let shutdown_rx = shutdown_tx.subscribe();

            let product_query =
                ProductQueryGrpcServiceImpl::new(state.di_container.product_query.clone());
            let product_command =
                ProductCommandGrpcServiceImpl::new(state.di_container.product_command.clone());

            match start_grpc_server(product_query, product_command, grpc_addr, shutdown_rx).await {
                Ok(()) => {
                    info!("gRPC server stopped gracefully.");
                    break;
                }
                Err(e) => {
                    error!("gRPC server failed: {e}. Restarting in 5s...");
                    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                }
            }
        }
    })
}

async fn shutdown(telemetry: Telemetry, server_handle: tokio::task::JoinHandle<()>) {
    info!("🛑 Shutting down all servers...");

    let shutdown_timeout = tokio::time::Duration::from_secs(30);

    match tokio::time::timeout(shutdown_timeout, server_handle).await {
        Ok(join_result) => {
            if let Err(e) = join_result {
                error!("Server task panicked: {}", e);
            }
            info!("✅ All servers shutdown gracefully.");
        }
        Err(_) => {
            warn!("⚠️  Shutdown timeout reached, forcing exit.");
        }
    }

    if let Err(e) = telemetry.shutdown().await {
        error!("Failed to shutdown telemetry: {}", e);
    }

    info!("✅ Product Service shutdown complete.");
}

async fn start_grpc_server(
    product_query_handler: ProductQueryGrpcServiceImpl,
    product_command_handler: ProductCommandGrpcServiceImpl,
    addr: SocketAddr,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    info!("Starting gRPC server on {addr}");

    let shutdown_future = async move {
        let _ = shutdown_rx.recv().await;
        info!("gRPC server received shutdown signal");
    };

    tonic::transport::Server::builder()
        .add_service(ProductQueryServiceServer::new(product_query_handler))
        .add_service(ProductCommandServiceServer::new(product_command_handler))
        .serve_with_shutdown(addr, shutdown_future)
        .await
        .context("gRPC server failed to start or serve")
}

async fn run_migrations(pool: &ConnectionPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    Ok(())
}
