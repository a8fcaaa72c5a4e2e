use parking_lot::Mutex;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::metrics::{counter::Counter, family::Family, gauge::Gauge};
use prometheus_client::registry::Registry;
use prometheus_client_derive_encode::{EncodeLabelSet, EncodeLabelValue};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    sync::{Arc, atomic::AtomicU64},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use utoipa::ToSchema;

/// Load sample served on `/usage` and consumed by the autoscaler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

fn get_thread_count(pid: u32) -> Option<i64> {
    let path = format!("/proc/{pid}/status");
    let contents = fs::read_to_string(path).ok()?;

    contents
        .lines()
        .find(|line| line.starts_with("Threads:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|count| count.parse::<i64>().ok())
}

#[derive(Debug, Clone)]
pub struct SystemMetrics {
    pub memory_alloc_bytes: Gauge,
    pub memory_sys_bytes: Gauge,
    pub thread_usage: Gauge,
    pub cpu_percent: Gauge<f64, AtomicU64>,
    pub memory_percent: Gauge<f64, AtomicU64>,
    pub process_start_time: Gauge,
    system: Arc<Mutex<System>>,
    last_usage: Arc<Mutex<ResourceUsage>>,
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetrics {
    pub fn new() -> Self {
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        let metrics = Self {
            memory_alloc_bytes: Gauge::default(),
            memory_sys_bytes: Gauge::default(),
            thread_usage: Gauge::default(),
            cpu_percent: Gauge::default(),
            memory_percent: Gauge::default(),
            process_start_time: Gauge::default(),
            system: Arc::new(Mutex::new(System::new())),
            last_usage: Arc::new(Mutex::new(ResourceUsage::default())),
        };

        metrics.process_start_time.set(start_time);
        metrics
    }

    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "process_memory_alloc_bytes",
            "Resident memory of the process in bytes",
            self.memory_alloc_bytes.clone(),
        );

        registry.register(
            "process_memory_sys_bytes",
            "Virtual memory of the process in bytes",
            self.memory_sys_bytes.clone(),
        );

        registry.register(
            "process_thread_total",
            "Thread total",
            self.thread_usage.clone(),
        );

        registry.register(
            "process_cpu_percent",
            "Process CPU usage normalised to all cores",
            self.cpu_percent.clone(),
        );

        registry.register(
            "process_memory_percent",
            "Process resident memory as a share of host memory",
            self.memory_percent.clone(),
        );

        registry.register(
            "process_start_time_seconds",
            "Start time of the process since unix epoch in seconds",
            self.process_start_time.clone(),
        );
    }

    /// Refreshes the process sample. CPU usage is measured between two
    /// consecutive refreshes, so the first sample after start reads zero.
    pub fn update_metrics(&self) -> ResourceUsage {
        let pid = std::process::id();
        let mut sys = self.system.lock();

        sys.refresh_memory();
        sys.refresh_cpu_usage();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[Pid::from_u32(pid)]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let cpus = sys.cpus().len().max(1) as f64;
        let total_memory = sys.total_memory();

        let mut usage = ResourceUsage::default();

        if let Some(process) = sys.process(Pid::from_u32(pid)) {
            let resident = process.memory();
            self.memory_alloc_bytes.set(resident as i64);
            self.memory_sys_bytes.set(process.virtual_memory() as i64);

            usage.cpu_percent = f64::from(process.cpu_usage()) / cpus;
            if total_memory > 0 {
                usage.memory_percent = resident as f64 * 100.0 / total_memory as f64;
            }
        }

        if let Some(thread_count) = get_thread_count(pid) {
            self.thread_usage.set(thread_count);
        }

        self.cpu_percent.set(usage.cpu_percent);
        self.memory_percent.set(usage.memory_percent);
        *self.last_usage.lock() = usage;

        usage
    }

    pub fn usage(&self) -> ResourceUsage {
        *self.last_usage.lock()
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Status {
    Success,
    Error,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct Labels {
    pub method: Method,
    pub status: Status,
}

#[derive(Clone, Debug)]
pub struct Metrics {
    pub request_counter: Family<Labels, Counter>,
    pub request_duration: Family<Labels, Histogram>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            request_counter: Family::default(),
            request_duration: Family::new_with_constructor(|| {
                Histogram::new(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ])
            }),
        }
    }

    /// Registers `<prefix>_request_counter` and `<prefix>_request_duration`.
    pub fn register(&self, prefix: &str, component: &str, registry: &mut Registry) {
        registry.register(
            format!("{prefix}_request_counter"),
            format!("Total number of requests to the {component}"),
            self.request_counter.clone(),
        );
        registry.register(
            format!("{prefix}_request_duration"),
            format!("Histogram of request durations for the {component}"),
            self.request_duration.clone(),
        );
    }

    pub fn record(&self, method: Method, status: Status, duration_secs: f64) {
        let labels = Labels { method, status };
        self.request_counter.get_or_create(&labels).inc();
        self.request_duration
            .get_or_create(&labels)
            .observe(duration_secs);
    }
}

pub async fn run_metrics_collector(system_metrics: Arc<SystemMetrics>) {
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    loop {
        interval.tick().await;
        system_metrics.update_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn recorded_requests_show_up_in_the_registry() {
        let mut registry = Registry::default();
        let metrics = Metrics::new();
        metrics.register("user_query_service", "UserQueryService", &mut registry);

        metrics.record(Method::Get, Status::Success, 0.02);
        metrics.record(Method::Get, Status::Error, 0.5);

        let mut out = String::new();
        encode(&mut out, &registry).unwrap();

        assert!(out.contains("user_query_service_request_counter_total"));
        assert!(out.contains("status=\"Error\""));
    }

    #[test]
    fn usage_sample_is_within_bounds() {
        let metrics = SystemMetrics::new();
        let usage = metrics.update_metrics();

        assert!(usage.cpu_percent >= 0.0);
        assert!((0.0..=100.0).contains(&usage.memory_percent));
        assert_eq!(metrics.usage(), usage);
    }
}
