mod logs;
mod metrics;
mod metrics_server;
mod otel;
mod operation;
mod optimistic;
mod shutdown;

pub use self::logs::init_logger;
pub use self::metrics::{
    Method, Metrics, ResourceUsage, Status, SystemMetrics, run_metrics_collector,
};
pub use self::metrics_server::{MetricsServerState, metrics_handler, metrics_router, serve_metrics};
pub use self::operation::{MetadataInjector, OperationTracer};
pub use self::optimistic::{OPTIMISTIC_LOCK_ATTEMPTS, retry_on_conflict};
pub use self::otel::{Telemetry, TracingContext};
pub use self::shutdown::shutdown_signal;
