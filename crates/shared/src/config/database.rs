use crate::config::StoreConfig;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

pub type ConnectionPool = Pool<Postgres>;

pub struct ConnectionManager;

impl ConnectionManager {
    pub async fn new_pool(
        connection_string: &str,
        min_connections: u32,
        max_connections: u32,
    ) -> anyhow::Result<ConnectionPool> {
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(connection_string)
            .await
            .map_err(|err| anyhow::anyhow!("Failed to create database connection pool: {}", err))?;

        Ok(pool)
    }
}

/// Where a service keeps its rows.
#[derive(Clone, Debug)]
pub enum StoreBackend {
    Postgres(ConnectionPool),
    Memory,
}

impl StoreBackend {
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                let pool =
                    ConnectionManager::new_pool(url, config.db_min_conn, config.db_max_conn)
                        .await?;
                info!("🗄️ Connected to Postgres");
                Ok(StoreBackend::Postgres(pool))
            }
            None => {
                warn!("DATABASE_URL not set, keeping data in memory for this process only");
                Ok(StoreBackend::Memory)
            }
        }
    }
}
