mod database;
mod myconfig;
mod resilience;

pub use self::database::{ConnectionManager, ConnectionPool, StoreBackend};
pub use self::myconfig::{ServiceConfig, StoreConfig, TelemetryConfig, grpc_addr_from_env};
pub use self::resilience::{CircuitBreakerConfig, ResilienceConfig, RetryConfig, env_or};
