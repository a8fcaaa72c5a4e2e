use prometheus_client::{
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use prometheus_client_derive_encode::{EncodeLabelSet, EncodeLabelValue};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Outcome {
    Applied,
    Failed,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ServiceLabels {
    pub service: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CommandLabels {
    pub service: String,
    pub direction: Direction,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Default)]
pub struct ScalerMetrics {
    pub replicas: Family<ServiceLabels, Gauge>,
    pub scale_commands: Family<CommandLabels, Counter>,
}

impl ScalerMetrics {
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "autoscaler_replicas",
            "Replica count the autoscaler last applied per service",
            self.replicas.clone(),
        );
        registry.register(
            "autoscaler_scale_commands",
            "Scale commands issued per service, direction and outcome",
            self.scale_commands.clone(),
        );
    }

    pub fn set_replicas(&self, service: &str, replicas: u32) {
        self.replicas
            .get_or_create(&ServiceLabels {
                service: service.to_string(),
            })
            .set(i64::from(replicas));
    }

    pub fn record_command(&self, service: &str, direction: Direction, outcome: Outcome) {
        self.scale_commands
            .get_or_create(&CommandLabels {
                service: service.to_string(),
                direction,
                outcome,
            })
            .inc();
    }
}
