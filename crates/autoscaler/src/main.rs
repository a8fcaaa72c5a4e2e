use anyhow::{Context, Result};
use autoscaler::{
    config::Config,
    controller::Autoscaler,
    metrics::ScalerMetrics,
    probe::{DynUsageProbe, HttpUsageProbe},
    scaler::{ComposeScaler, DryRunScaler, DynScaler},
};
use prometheus_client::registry::Registry;
use shared::utils::{
    MetricsServerState, SystemMetrics, Telemetry, init_logger, run_metrics_collector,
    serve_metrics, shutdown_signal,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::init().context("Failed to load configuration")?;

    let mut telemetry = Telemetry::new("autoscaler", config.telemetry.otel_endpoint.clone());
    let logger_provider = telemetry.init_logger()?;
    telemetry.init_meter()?;
    telemetry.init_tracer()?;

    init_logger(
        logger_provider,
        "autoscaler",
        config.telemetry.is_dev,
        config.telemetry.enable_file_log,
    );

    let probe: DynUsageProbe = Arc::new(
        HttpUsageProbe::new(Duration::from_secs(5)).context("Failed to build usage probe")?,
    );

    let scaler: DynScaler = if config.dry_run {
        warn!("AUTOSCALE_DRY_RUN is set, scale commands will only be logged");
        Arc::new(DryRunScaler)
    } else {
        Arc::new(ComposeScaler::new(config.compose_file.clone()))
    };

    let mut registry = Registry::default();
    let metrics = ScalerMetrics::default();
    metrics.register(&mut registry);

    let system_metrics = Arc::new(SystemMetrics::new());
    system_metrics.register(&mut registry);
    tokio::spawn(run_metrics_collector(system_metrics.clone()));

    let autoscaler = Autoscaler::new(config.services.clone(), probe, scaler, metrics);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let metrics_state = MetricsServerState {
        registry: Arc::new(registry),
        system_metrics,
    };
    let metric_addr = SocketAddr::from(([0, 0, 0, 0], config.metric_port));
    let metrics_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = serve_metrics(metric_addr, metrics_state, metrics_shutdown).await {
            error!("Metrics server failed: {e:#}");
        }
    });

    let loops = autoscaler.spawn(&shutdown_tx);
    info!("✅ Autoscaler watching {} services", loops.len());

    shutdown_signal(shutdown_tx).await;

    for handle in loops {
        if let Err(e) = handle.await {
            error!("Autoscaler loop panicked: {e}");
        }
    }

    if let Err(e) = telemetry.shutdown().await {
        error!("Failed to shutdown telemetry: {}", e);
    }

    info!("✅ Autoscaler shutdown complete.");
    Ok(())
}
