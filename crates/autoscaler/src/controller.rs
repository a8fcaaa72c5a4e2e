use crate::{
    config::ServicePolicy,
    errors::AutoscaleError,
    metrics::{Direction, Outcome, ScalerMetrics},
    probe::DynUsageProbe,
    scaler::DynScaler,
};
use shared::utils::ResourceUsage;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, broadcast},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    ScaleUp,
    ScaleDown,
    Hold,
}

/// Pure threshold check on one load sample.
pub fn decide(policy: &ServicePolicy, usage: ResourceUsage) -> Decision {
    let memory_high = policy
        .memory_high_watermark
        .is_some_and(|watermark| usage.memory_percent >= watermark);

    if usage.cpu_percent >= policy.cpu_high_watermark || memory_high {
        Decision::ScaleUp
    } else if usage.cpu_percent <= policy.cpu_low_watermark {
        Decision::ScaleDown
    } else {
        Decision::Hold
    }
}

/// Replica count to ask for, always within `[min_replicas, max_replicas]`.
pub fn target_replicas(policy: &ServicePolicy, current: u32, decision: Decision) -> u32 {
    let wanted = match decision {
        Decision::ScaleUp => current.saturating_add(1),
        Decision::ScaleDown => current.saturating_sub(1),
        Decision::Hold => current,
    };

    wanted.clamp(policy.min_replicas, policy.max_replicas)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Already at the target, or inside the cooldown after the last command.
    Unchanged,
    Scaled { from: u32, to: u32 },
}

#[derive(Debug)]
struct ReplicaState {
    replicas: u32,
    last_command: Option<Instant>,
}

/// Owns the replica count of one service. Decisions and scale commands for
/// that service are serialized by the state lock.
pub struct ServiceController {
    policy: ServicePolicy,
    probe: DynUsageProbe,
    scaler: DynScaler,
    metrics: ScalerMetrics,
    state: Mutex<ReplicaState>,
}

impl ServiceController {
    pub fn new(
        policy: ServicePolicy,
        probe: DynUsageProbe,
        scaler: DynScaler,
        metrics: ScalerMetrics,
    ) -> Self {
        metrics.set_replicas(&policy.name, policy.min_replicas);

        Self {
            state: Mutex::new(ReplicaState {
                replicas: policy.min_replicas,
                last_command: None,
            }),
            policy,
            probe,
            scaler,
            metrics,
        }
    }

    pub fn policy(&self) -> &ServicePolicy {
        &self.policy
    }

    pub async fn replicas(&self) -> u32 {
        self.state.lock().await.replicas
    }

    /// One poll: sample the service, then reconcile. A failed probe skips
    /// the tick without touching the replica count.
    pub async fn tick(&self) -> Result<TickOutcome, AutoscaleError> {
        let usage = match self.probe.sample(&self.policy).await {
            Ok(usage) => usage,
            Err(e) => {
                warn!(service = %self.policy.name, error = %e, "usage probe failed, skipping tick");
                return Err(e);
            }
        };

        self.reconcile(usage).await
    }

    /// Applies the decision for `usage`. Issues at most one scale command;
    /// a failed command leaves the recorded replica count as it was.
    pub async fn reconcile(&self, usage: ResourceUsage) -> Result<TickOutcome, AutoscaleError> {
        let name = &self.policy.name;
        let mut state = self.state.lock().await;

        if let Some(at) = state.last_command
            && at.elapsed() < self.policy.cooldown
        {
            debug!(service = %name, "cooling down after last scale command");
            return Ok(TickOutcome::Unchanged);
        }

        let decision = decide(&self.policy, usage);
        let current = state.replicas;
        let target = target_replicas(&self.policy, current, decision);

        debug!(
            service = %name,
            cpu = usage.cpu_percent,
            memory = usage.memory_percent,
            ?decision,
            current,
            target,
            "scale decision"
        );

        if target == current {
            return Ok(TickOutcome::Unchanged);
        }

        let direction = if target > current {
            Direction::Up
        } else {
            Direction::Down
        };

        match self.scaler.scale(name, target).await {
            Ok(()) => {
                info!(service = %name, from = current, to = target, "scaled");
                state.replicas = target;
                state.last_command = Some(Instant::now());
                self.metrics.set_replicas(name, target);
                self.metrics.record_command(name, direction, Outcome::Applied);
                Ok(TickOutcome::Scaled {
                    from: current,
                    to: target,
                })
            }
            Err(e) => {
                error!(service = %name, from = current, to = target, error = %e, "scale command failed");
                self.metrics.record_command(name, direction, Outcome::Failed);
                Err(e)
            }
        }
    }

    /// Polls every `poll_interval` until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.policy.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            service = %self.policy.name,
            min = self.policy.min_replicas,
            max = self.policy.max_replicas,
            every_secs = self.policy.poll_interval.as_secs(),
            "autoscaler loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(service = %self.policy.name, "autoscaler loop stopped");
                    break;
                }
                _ = interval.tick() => {
                    // Failures are logged inside tick; the loop keeps going.
                    let _ = self.tick().await;
                }
            }
        }
    }
}

/// One controller per configured service.
pub struct Autoscaler {
    controllers: Vec<Arc<ServiceController>>,
}

impl Autoscaler {
    pub fn new(
        policies: Vec<ServicePolicy>,
        probe: DynUsageProbe,
        scaler: DynScaler,
        metrics: ScalerMetrics,
    ) -> Self {
        let controllers = policies
            .into_iter()
            .map(|policy| {
                Arc::new(ServiceController::new(
                    policy,
                    probe.clone(),
                    scaler.clone(),
                    metrics.clone(),
                ))
            })
            .collect();

        Self { controllers }
    }

    pub fn controllers(&self) -> &[Arc<ServiceController>] {
        &self.controllers
    }

    pub fn spawn(&self, shutdown_tx: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        self.controllers
            .iter()
            .map(|controller| tokio::spawn(controller.clone().run(shutdown_tx.subscribe())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn policy() -> ServicePolicy {
        ServicePolicy {
            name: "order".into(),
            min_replicas: 1,
            max_replicas: 3,
            cpu_high_watermark: 75.0,
            cpu_low_watermark: 25.0,
            memory_high_watermark: Some(85.0),
            poll_interval: Duration::from_secs(15),
            cooldown: Duration::from_secs(60),
            usage_url: "http://order:9093/usage".into(),
        }
    }

    fn usage(cpu_percent: f64, memory_percent: f64) -> ResourceUsage {
        ResourceUsage {
            cpu_percent,
            memory_percent,
        }
    }

    #[test]
    fn thresholds_pick_the_direction() {
        let p = policy();

        assert_eq!(decide(&p, usage(90.0, 10.0)), Decision::ScaleUp);
        assert_eq!(decide(&p, usage(75.0, 10.0)), Decision::ScaleUp);
        assert_eq!(decide(&p, usage(50.0, 90.0)), Decision::ScaleUp);
        assert_eq!(decide(&p, usage(10.0, 10.0)), Decision::ScaleDown);
        assert_eq!(decide(&p, usage(50.0, 10.0)), Decision::Hold);
    }

    #[test]
    fn memory_pressure_blocks_scale_down() {
        assert_eq!(decide(&policy(), usage(5.0, 95.0)), Decision::ScaleUp);
    }

    #[test]
    fn memory_is_ignored_without_a_watermark() {
        let p = ServicePolicy {
            memory_high_watermark: None,
            ..policy()
        };
        assert_eq!(decide(&p, usage(5.0, 99.0)), Decision::ScaleDown);
    }

    #[test]
    fn target_never_leaves_the_bounds() {
        let p = policy();

        assert_eq!(target_replicas(&p, 3, Decision::ScaleUp), 3);
        assert_eq!(target_replicas(&p, 1, Decision::ScaleDown), 1);
        assert_eq!(target_replicas(&p, 2, Decision::ScaleUp), 3);
        assert_eq!(target_replicas(&p, 7, Decision::Hold), 3);
        assert_eq!(target_replicas(&p, 0, Decision::Hold), 1);
    }
}
