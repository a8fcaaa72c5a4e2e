use anyhow::{Context, Result, anyhow};
use shared::config::{ResilienceConfig, TelemetryConfig, env_or, grpc_addr_from_env};

#[derive(Debug, Clone)]
pub struct GrpcClientConfig {
    pub user: String,
    pub product: String,
    pub order: String,
}

impl GrpcClientConfig {
    pub fn init() -> Result<Self> {
        Ok(Self {
            user: grpc_addr_from_env("GRPC_USER_ADDR")?,
            product: grpc_addr_from_env("GRPC_PRODUCT_ADDR")?,
            order: grpc_addr_from_env("GRPC_ORDER_ADDR")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Entries kept per resource for stale reads while an upstream is down.
    pub cache_capacity: usize,
    pub grpc_clients: GrpcClientConfig,
    pub resilience: ResilienceConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    pub fn init() -> Result<Self> {
        let port = std::env::var("PORT")
            .context("Missing environment variable: PORT")?
            .parse::<u16>()
            .context("PORT must be a valid u16 integer")?;

        let cache_capacity: usize = env_or("GATEWAY_CACHE_CAPACITY", 1024)?;
        if cache_capacity == 0 {
            return Err(anyhow!("GATEWAY_CACHE_CAPACITY must be greater than zero"));
        }

        let grpc_clients = GrpcClientConfig::init().context("failed to load gRPC peers")?;
        let resilience = ResilienceConfig::from_env().context("failed to load resilience policy")?;

        Ok(Self {
            port,
            cache_capacity,
            grpc_clients,
            resilience,
            telemetry: TelemetryConfig::from_env(),
        })
    }
}
