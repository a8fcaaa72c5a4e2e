use crate::{config::Config, routing::RoutingTable, service::GrpcClients};
use anyhow::{Context, Result};
use prometheus_client::registry::Registry;
use shared::utils::{SystemMetrics, run_metrics_collector};
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub routing: Arc<RoutingTable>,
    pub registry: Arc<Registry>,
    pub system_metrics: Arc<SystemMetrics>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("routing", &self.routing)
            .field("system_metrics", &self.system_metrics)
            .finish()
    }
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let mut registry = Registry::default();
        let system_metrics = Arc::new(SystemMetrics::new());

        let routing =
            GrpcClients::init(config, &mut registry).context("failed to build routing table")?;

        system_metrics.register(&mut registry);
        tokio::spawn(run_metrics_collector(system_metrics.clone()));

        Ok(Self {
            routing: Arc::new(routing),
            registry: Arc::new(registry),
            system_metrics,
        })
    }
}
