use crate::grpc_client::GrpcClientConfig;
use anyhow::{Context, Result};
use shared::config::{ResilienceConfig, ServiceConfig, StoreConfig, TelemetryConfig, env_or};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServiceConfig,
    pub store: StoreConfig,
    pub telemetry: TelemetryConfig,
    pub grpc_clients: GrpcClientConfig,
    pub resilience: ResilienceConfig,
    /// How long a pay or cancel may hold an order before a retry of the
    /// same event is allowed to take it over.
    pub claim_lease: Duration,
}

impl Config {
    pub fn init() -> Result<Self> {
        let server = ServiceConfig::from_env("ORDER").context("invalid order server config")?;
        let store = StoreConfig::from_env().context("invalid store config")?;
        let telemetry = TelemetryConfig::from_env();
        let grpc_clients = GrpcClientConfig::init().context("invalid peer addresses")?;
        let resilience = ResilienceConfig::from_env().context("invalid resilience config")?;
        let claim_lease = Duration::from_secs(env_or("ORDER_SAGA_CLAIM_LEASE_SECS", 120u64)?);

        Ok(Self {
            server,
            store,
            telemetry,
            grpc_clients,
            resilience,
            claim_lease,
        })
    }
}
