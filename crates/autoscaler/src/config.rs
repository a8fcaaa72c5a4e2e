use anyhow::{Context, Result, anyhow, bail};
use shared::config::TelemetryConfig;
use std::{path::PathBuf, str::FromStr, time::Duration};

/// Scaling bounds and thresholds for one service. Watermarks are percentages
/// of the host's CPU and memory as reported on the service's `/usage`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServicePolicy {
    pub name: String,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub cpu_high_watermark: f64,
    pub cpu_low_watermark: f64,
    pub memory_high_watermark: Option<f64>,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub usage_url: String,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

impl ServicePolicy {
    pub fn from_env(name: &str) -> Result<Self> {
        Self::from_lookup(name, |key| std::env::var(key).ok())
    }

    /// Reads `AUTOSCALE_<NAME>_*` through `lookup` and validates the result.
    pub fn from_lookup(name: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let upper = name.to_ascii_uppercase();
        let key = |suffix: &str| format!("AUTOSCALE_{upper}_{suffix}");

        let memory_key = key("MEMORY_HIGH_WATERMARK");
        let memory_high_watermark = match lookup(&memory_key) {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<f64>()
                    .with_context(|| format!("{memory_key} has an invalid value: {raw}"))?,
            ),
            _ => None,
        };

        let usage_url = match lookup(&key("USAGE_URL")) {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => {
                let port_key = format!("{upper}_METRIC_PORT");
                let port = lookup(&port_key).ok_or_else(|| {
                    anyhow!("{} or {port_key} must be set", key("USAGE_URL"))
                })?;
                format!("http://{name}:{}/usage", port.trim())
            }
        };

        let policy = Self {
            name: name.to_string(),
            min_replicas: parse_or(&lookup, &key("MIN_REPLICAS"), 1)?,
            max_replicas: parse_or(&lookup, &key("MAX_REPLICAS"), 3)?,
            cpu_high_watermark: parse_or(&lookup, &key("CPU_HIGH_WATERMARK"), 75.0)?,
            cpu_low_watermark: parse_or(&lookup, &key("CPU_LOW_WATERMARK"), 25.0)?,
            memory_high_watermark,
            poll_interval: Duration::from_secs(parse_or(&lookup, &key("POLL_INTERVAL_SECS"), 15)?),
            cooldown: Duration::from_secs(parse_or(&lookup, &key("COOLDOWN_SECS"), 60)?),
            usage_url,
        };

        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        let name = &self.name;

        if self.min_replicas == 0 {
            bail!("{name}: min_replicas must be at least 1");
        }
        if self.min_replicas > self.max_replicas {
            bail!(
                "{name}: min_replicas ({}) exceeds max_replicas ({})",
                self.min_replicas,
                self.max_replicas
            );
        }
        if self.cpu_low_watermark >= self.cpu_high_watermark {
            bail!(
                "{name}: cpu_low_watermark ({}) must be below cpu_high_watermark ({})",
                self.cpu_low_watermark,
                self.cpu_high_watermark
            );
        }

        let mut watermarks = vec![self.cpu_low_watermark, self.cpu_high_watermark];
        watermarks.extend(self.memory_high_watermark);
        if watermarks.iter().any(|w| !(0.0..=100.0).contains(w)) {
            bail!("{name}: watermarks must be percentages between 0 and 100");
        }

        if self.poll_interval.is_zero() {
            bail!("{name}: poll interval must be greater than zero");
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub services: Vec<ServicePolicy>,
    pub dry_run: bool,
    pub compose_file: Option<PathBuf>,
    pub metric_port: u16,
    pub telemetry: TelemetryConfig,
}

impl Config {
    pub fn init() -> Result<Self> {
        let names = std::env::var("AUTOSCALE_SERVICES")
            .unwrap_or_else(|_| "user,product,order".to_string());

        let services = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                ServicePolicy::from_env(name)
                    .with_context(|| format!("invalid autoscale policy for {name}"))
            })
            .collect::<Result<Vec<_>>>()?;

        if services.is_empty() {
            bail!("AUTOSCALE_SERVICES names no services");
        }

        let dry_run = std::env::var("AUTOSCALE_DRY_RUN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let compose_file = std::env::var("AUTOSCALE_COMPOSE_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let metric_port: u16 = shared::config::env_or("AUTOSCALE_METRIC_PORT", 9100)?;

        Ok(Self {
            services,
            dry_run,
            compose_file,
            metric_port,
            telemetry: TelemetryConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| env.get(key).cloned()
    }

    #[test]
    fn defaults_fill_in_around_the_metric_port() {
        let policy = ServicePolicy::from_lookup("user", lookup(&[("USER_METRIC_PORT", "9091")]))
            .unwrap();

        assert_eq!(policy.min_replicas, 1);
        assert_eq!(policy.max_replicas, 3);
        assert_eq!(policy.memory_high_watermark, None);
        assert_eq!(policy.poll_interval, Duration::from_secs(15));
        assert_eq!(policy.usage_url, "http://user:9091/usage");
    }

    #[test]
    fn reads_per_service_overrides() {
        let policy = ServicePolicy::from_lookup(
            "order",
            lookup(&[
                ("AUTOSCALE_ORDER_MIN_REPLICAS", "2"),
                ("AUTOSCALE_ORDER_MAX_REPLICAS", "6"),
                ("AUTOSCALE_ORDER_CPU_HIGH_WATERMARK", "80"),
                ("AUTOSCALE_ORDER_CPU_LOW_WATERMARK", "20.5"),
                ("AUTOSCALE_ORDER_MEMORY_HIGH_WATERMARK", "90"),
                ("AUTOSCALE_ORDER_POLL_INTERVAL_SECS", "5"),
                ("AUTOSCALE_ORDER_COOLDOWN_SECS", "30"),
                ("AUTOSCALE_ORDER_USAGE_URL", "http://order-service:9093/usage"),
            ]),
        )
        .unwrap();

        assert_eq!(policy.min_replicas, 2);
        assert_eq!(policy.max_replicas, 6);
        assert_eq!(policy.cpu_low_watermark, 20.5);
        assert_eq!(policy.memory_high_watermark, Some(90.0));
        assert_eq!(policy.cooldown, Duration::from_secs(30));
        assert_eq!(policy.usage_url, "http://order-service:9093/usage");
    }

    #[test]
    fn rejects_invalid_bounds() {
        let base = [("PRODUCT_METRIC_PORT", "9092")];

        for bad in [
            ("AUTOSCALE_PRODUCT_MIN_REPLICAS", "0"),
            ("AUTOSCALE_PRODUCT_MIN_REPLICAS", "4"),
            ("AUTOSCALE_PRODUCT_CPU_LOW_WATERMARK", "75"),
            ("AUTOSCALE_PRODUCT_CPU_HIGH_WATERMARK", "150"),
            ("AUTOSCALE_PRODUCT_POLL_INTERVAL_SECS", "0"),
            ("AUTOSCALE_PRODUCT_MAX_REPLICAS", "many"),
        ] {
            let result = ServicePolicy::from_lookup("product", lookup(&[base[0], bad]));
            assert!(result.is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn missing_usage_location_is_an_error() {
        assert!(ServicePolicy::from_lookup("user", lookup(&[])).is_err());
    }
}
