use crate::config::resilience::env_or;
use anyhow::{Context, Result, anyhow};
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub grpc_port: u16,
    pub metric_port: u16,
}

impl ServiceConfig {
    /// Reads `<PREFIX>_GRPC_PORT` and `<PREFIX>_METRIC_PORT`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let grpc_key = format!("{prefix}_GRPC_PORT");
        let metric_key = format!("{prefix}_METRIC_PORT");

        let grpc_port = std::env::var(&grpc_key)
            .with_context(|| format!("Missing environment variable: {grpc_key}"))?
            .parse::<u16>()
            .with_context(|| format!("{grpc_key} must be a valid u16 integer"))?;

        let metric_port = std::env::var(&metric_key)
            .with_context(|| format!("Missing environment variable: {metric_key}"))?
            .parse::<u16>()
            .with_context(|| format!("{metric_key} must be a valid u16 integer"))?;

        Ok(Self {
            grpc_port,
            metric_port,
        })
    }

    pub fn grpc_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.grpc_port))
    }

    pub fn metric_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.metric_port))
    }
}

/// Where a service keeps its own data. Without `DATABASE_URL` the service
/// falls back to an in-process store, which is only meant for local runs.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub db_max_conn: u32,
    pub db_min_conn: u32,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let run_migrations = match std::env::var("RUN_MIGRATIONS")
            .unwrap_or_else(|_| "true".to_string())
            .as_str()
        {
            "true" => true,
            "false" => false,
            other => {
                return Err(anyhow!(
                    "RUN_MIGRATIONS must be 'true' or 'false', got '{}'",
                    other
                ));
            }
        };

        let db_max_conn: u32 = env_or("DB_MAX_CONNECTION", 5)?;
        let db_min_conn: u32 = env_or("DB_MIN_CONNECTION", 1)?;

        if db_min_conn > db_max_conn {
            return Err(anyhow!(
                "DB_MIN_CONNECTION ({db_min_conn}) exceeds DB_MAX_CONNECTION ({db_max_conn})"
            ));
        }

        Ok(Self {
            database_url,
            run_migrations,
            db_max_conn,
            db_min_conn,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub otel_endpoint: String,
    pub is_dev: bool,
    pub enable_file_log: bool,
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        let otel_endpoint = std::env::var("OTEL_ENDPOINT")
            .unwrap_or_else(|_| "http://otel-collector:4317".to_string());

        let is_dev = std::env::var("DEV_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let enable_file_log = std::env::var("ENABLE_FILE_LOG")
            .map(|v| v == "true")
            .unwrap_or(false);

        Self {
            otel_endpoint,
            is_dev,
            enable_file_log,
        }
    }
}

/// Reads a required gRPC peer address such as `GRPC_PRODUCT_ADDR`.
pub fn grpc_addr_from_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Missing environment variable: {key}"))
}
