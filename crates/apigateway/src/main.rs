use anyhow::{Context, Result};
use apigateway::{config::Config, handler::AppRouter, state::AppState};
use shared::utils::{Telemetry, init_logger, shutdown_signal};
use tokio::sync::broadcast;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::init().context("Failed to load configuration")?;

    let mut telemetry = Telemetry::new("apigateway", config.telemetry.otel_endpoint.clone());
    let logger_provider = telemetry.init_logger()?;
    telemetry.init_meter()?;
    telemetry.init_tracer()?;

    init_logger(
        logger_provider,
        "apigateway",
        config.telemetry.is_dev,
        config.telemetry.enable_file_log,
    );

    let state = AppState::new(&config).context("Failed to create AppState")?;

    for endpoint in state.routing.endpoints() {
        info!(
            resource = %endpoint.resource,
            service = endpoint.service,
            addr = %endpoint.addr,
            "route registered"
        );
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(shutdown_signal(shutdown_tx));

    let served = AppRouter::serve(config.port, state, shutdown_rx).await;

    info!("🛑 Shutting down gateway...");

    if let Err(e) = telemetry.shutdown().await {
        error!("Failed to shutdown telemetry: {}", e);
    }

    served.context("Failed to start server")
}
