use anyhow::{Context, Result, anyhow};
use std::{str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures inside `window` required before the circuit may open.
    pub failure_threshold: u32,
    /// Fraction of failed calls inside `window` required to open (0.0..=1.0).
    pub failure_rate_threshold: f64,
    pub window: Duration,
    /// Time spent open before a half-open trial is admitted.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_rate_threshold: 0.5,
            window: Duration::from_secs(30),
            cooldown: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub breaker: CircuitBreakerConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl ResilienceConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let timeout_ms: u64 = env_or("RESILIENCE_TIMEOUT_MS", defaults.timeout.as_millis() as u64)?;
        let max_attempts: u32 = env_or("RESILIENCE_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        let initial_backoff_ms: u64 = env_or(
            "RESILIENCE_INITIAL_BACKOFF_MS",
            defaults.retry.initial_backoff.as_millis() as u64,
        )?;
        let max_backoff_ms: u64 = env_or(
            "RESILIENCE_MAX_BACKOFF_MS",
            defaults.retry.max_backoff.as_millis() as u64,
        )?;
        let failure_threshold: u32 = env_or(
            "RESILIENCE_FAILURE_THRESHOLD",
            defaults.breaker.failure_threshold,
        )?;
        let failure_rate: f64 = env_or(
            "RESILIENCE_FAILURE_RATE",
            defaults.breaker.failure_rate_threshold,
        )?;
        let window_secs: u64 =
            env_or("RESILIENCE_WINDOW_SECS", defaults.breaker.window.as_secs())?;
        let cooldown_secs: u64 =
            env_or("RESILIENCE_COOLDOWN_SECS", defaults.breaker.cooldown.as_secs())?;

        if max_attempts == 0 {
            return Err(anyhow!("RESILIENCE_MAX_ATTEMPTS must be at least 1"));
        }
        if failure_threshold == 0 {
            return Err(anyhow!("RESILIENCE_FAILURE_THRESHOLD must be at least 1"));
        }
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(anyhow!(
                "RESILIENCE_FAILURE_RATE must be between 0 and 1, got {failure_rate}"
            ));
        }

        Ok(Self {
            timeout: Duration::from_millis(timeout_ms),
            retry: RetryConfig {
                max_attempts,
                initial_backoff: Duration::from_millis(initial_backoff_ms),
                max_backoff: Duration::from_millis(max_backoff_ms),
                ..defaults.retry
            },
            breaker: CircuitBreakerConfig {
                failure_threshold,
                failure_rate_threshold: failure_rate,
                window: Duration::from_secs(window_secs),
                cooldown: Duration::from_secs(cooldown_secs),
            },
        })
    }
}

/// Reads and parses `key`, falling back to `default` when it is unset.
pub fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
