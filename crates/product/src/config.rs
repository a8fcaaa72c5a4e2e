use anyhow::{Context, Result};
use shared::config::{ServiceConfig, StoreConfig, TelemetryConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServiceConfig,
    pub store: StoreConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    pub fn init() -> Result<Self> {
        let server = ServiceConfig::from_env("PRODUCT").context("invalid product server config")?;
        let store = StoreConfig::from_env().context("invalid store config")?;
        let telemetry = TelemetryConfig::from_env();

        Ok(Self {
            server,
            store,
            telemetry,
        })
    }
}
