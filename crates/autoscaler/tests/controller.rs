use async_trait::async_trait;
use autoscaler::{
    config::ServicePolicy,
    controller::{Autoscaler, ServiceController, TickOutcome},
    errors::AutoscaleError,
    metrics::ScalerMetrics,
    probe::UsageProbe,
    scaler::Scaler,
};
use shared::utils::ResourceUsage;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::broadcast;

struct FakeProbe {
    usage: Mutex<Option<ResourceUsage>>,
}

impl FakeProbe {
    fn new(cpu_percent: f64) -> Arc<Self> {
        Arc::new(Self {
            usage: Mutex::new(Some(ResourceUsage {
                cpu_percent,
                memory_percent: 10.0,
            })),
        })
    }

    fn down() -> Arc<Self> {
        Arc::new(Self {
            usage: Mutex::new(None),
        })
    }
}

#[async_trait]
impl UsageProbe for FakeProbe {
    async fn sample(&self, policy: &ServicePolicy) -> Result<ResourceUsage, AutoscaleError> {
        self.usage
            .lock()
            .unwrap()
            .ok_or_else(|| AutoscaleError::probe(&policy.name, "connection refused"))
    }
}

#[derive(Default)]
struct FakeScaler {
    commands: Mutex<Vec<(String, u32)>>,
    failing: Mutex<bool>,
}

impl FakeScaler {
    fn commands(&self) -> Vec<(String, u32)> {
        self.commands.lock().unwrap().clone()
    }

    fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl Scaler for FakeScaler {
    async fn scale(&self, service: &str, replicas: u32) -> Result<(), AutoscaleError> {
        self.commands
            .lock()
            .unwrap()
            .push((service.to_string(), replicas));

        if *self.failing.lock().unwrap() {
            Err(AutoscaleError::scale(service, "docker exited with 1"))
        } else {
            Ok(())
        }
    }
}

fn policy(cooldown_secs: u64) -> ServicePolicy {
    ServicePolicy {
        name: "product".into(),
        min_replicas: 1,
        max_replicas: 3,
        cpu_high_watermark: 75.0,
        cpu_low_watermark: 25.0,
        memory_high_watermark: None,
        poll_interval: Duration::from_secs(15),
        cooldown: Duration::from_secs(cooldown_secs),
        usage_url: "http://product:9092/usage".into(),
    }
}

fn high() -> ResourceUsage {
    ResourceUsage {
        cpu_percent: 95.0,
        memory_percent: 10.0,
    }
}

fn low() -> ResourceUsage {
    ResourceUsage {
        cpu_percent: 5.0,
        memory_percent: 10.0,
    }
}

fn controller(
    cooldown_secs: u64,
    probe: Arc<FakeProbe>,
) -> (ServiceController, Arc<FakeScaler>) {
    let scaler = Arc::new(FakeScaler::default());
    let controller = ServiceController::new(
        policy(cooldown_secs),
        probe,
        scaler.clone(),
        ScalerMetrics::default(),
    );
    (controller, scaler)
}

#[tokio::test(start_paused = true)]
async fn unchanged_load_issues_at_most_one_command() {
    let (controller, scaler) = controller(60, FakeProbe::new(95.0));

    let first = controller.reconcile(high()).await.unwrap();
    let second = controller.reconcile(high()).await.unwrap();

    assert_eq!(first, TickOutcome::Scaled { from: 1, to: 2 });
    assert_eq!(second, TickOutcome::Unchanged);
    assert_eq!(scaler.commands(), vec![("product".to_string(), 2)]);
}

#[tokio::test(start_paused = true)]
async fn sustained_load_steps_up_to_max_and_stops() {
    let (controller, scaler) = controller(60, FakeProbe::new(95.0));

    for _ in 0..5 {
        controller.reconcile(high()).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
    }

    assert_eq!(controller.replicas().await, 3);
    assert_eq!(
        scaler.commands(),
        vec![("product".to_string(), 2), ("product".to_string(), 3)]
    );
}

#[tokio::test(start_paused = true)]
async fn idle_service_never_drops_below_min() {
    let (controller, scaler) = controller(0, FakeProbe::new(5.0));

    let outcome = controller.reconcile(low()).await.unwrap();

    assert_eq!(outcome, TickOutcome::Unchanged);
    assert_eq!(controller.replicas().await, 1);
    assert!(scaler.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_command_keeps_recorded_replicas() {
    let (controller, scaler) = controller(60, FakeProbe::new(95.0));
    scaler.fail(true);

    let err = controller.reconcile(high()).await.unwrap_err();
    assert!(matches!(err, AutoscaleError::Scale { .. }));
    assert_eq!(controller.replicas().await, 1);

    scaler.fail(false);
    let retried = controller.reconcile(high()).await.unwrap();

    assert_eq!(retried, TickOutcome::Scaled { from: 1, to: 2 });
    assert_eq!(scaler.commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_probe_skips_the_tick() {
    let (controller, scaler) = controller(0, FakeProbe::down());

    let err = controller.tick().await.unwrap_err();

    assert!(matches!(err, AutoscaleError::Probe { .. }));
    assert_eq!(controller.replicas().await, 1);
    assert!(scaler.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scales_back_down_when_load_drops() {
    let (controller, scaler) = controller(0, FakeProbe::new(95.0));

    controller.reconcile(high()).await.unwrap();
    controller.reconcile(high()).await.unwrap();
    controller.reconcile(low()).await.unwrap();

    assert_eq!(controller.replicas().await, 2);
    assert_eq!(
        scaler.commands(),
        vec![
            ("product".to_string(), 2),
            ("product".to_string(), 3),
            ("product".to_string(), 2),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn loops_poll_until_shutdown() {
    let scaler = Arc::new(FakeScaler::default());
    let autoscaler = Autoscaler::new(
        vec![policy(0)],
        FakeProbe::new(95.0),
        scaler.clone(),
        ScalerMetrics::default(),
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let handles = autoscaler.spawn(&shutdown_tx);

    tokio::time::sleep(Duration::from_secs(31)).await;
    shutdown_tx.send(()).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(autoscaler.controllers()[0].replicas().await, 3);
    assert_eq!(
        scaler.commands(),
        vec![("product".to_string(), 2), ("product".to_string(), 3)]
    );
}
