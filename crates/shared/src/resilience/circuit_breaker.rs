//! Per-downstream circuit breaker.
//!
//! One breaker is shared (behind an `Arc`) by every caller that targets the
//! same downstream service. All state lives in a single mutex-guarded struct so
//! transitions are atomic: callers observing `Open` fail fast, and exactly one
//! caller is admitted as the half-open trial once the cooldown has elapsed.

use crate::{config::CircuitBreakerConfig, errors::ServiceError};
use parking_lot::Mutex;
use prometheus_client::{metrics::gauge::Gauge, registry::Registry};
use std::{collections::VecDeque, time::Duration};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const MAX_TRACKED_OUTCOMES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn as_gauge(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    // (recorded_at, failed)
    outcomes: VecDeque<(Instant, bool)>,
}

impl CircuitInner {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some((at, _)) = self.outcomes.front() {
            if now.duration_since(*at) >= window || self.outcomes.len() > MAX_TRACKED_OUTCOMES {
                self.outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, failed)| *failed).count()
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failures_in_window: usize,
    pub calls_in_window: usize,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
    state_gauge: Gauge,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                opened_at: None,
                trial_in_flight: false,
                outcomes: VecDeque::new(),
            }),
            state_gauge: Gauge::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state: inner.state,
            failures_in_window: inner.failures(),
            calls_in_window: inner.outcomes.len(),
        }
    }

    /// Exposes the breaker state as `circuit_breaker_state{target="<name>"}`
    /// (0 closed, 1 open, 2 half-open).
    pub fn register(&self, registry: &mut Registry) {
        registry
            .sub_registry_with_label(("target".into(), self.name.clone().into()))
            .register(
                "circuit_breaker_state",
                "Circuit breaker state (0 closed, 1 open, 2 half-open)",
                self.state_gauge.clone(),
            );
    }

    /// Asks for permission to make one call. Fails fast with `CircuitOpen`
    /// while open, and while a half-open trial is already in flight.
    pub fn try_acquire(&self) -> Result<CircuitPermit<'_>, ServiceError> {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => Ok(CircuitPermit::new(self, false)),
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);

                if !cooled_down {
                    debug!(circuit_breaker = %self.name, "circuit open, failing fast");
                    return Err(ServiceError::CircuitOpen(self.name.clone()));
                }

                info!(circuit_breaker = %self.name, "cooldown elapsed, admitting trial call");
                self.set_state(&mut inner, CircuitState::HalfOpen);
                inner.trial_in_flight = true;
                Ok(CircuitPermit::new(self, true))
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return Err(ServiceError::CircuitOpen(self.name.clone()));
                }
                inner.trial_in_flight = true;
                Ok(CircuitPermit::new(self, true))
            }
        }
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        match inner.state {
            CircuitState::HalfOpen if trial => {
                info!(circuit_breaker = %self.name, "trial call succeeded, closing circuit");
                inner.trial_in_flight = false;
                inner.outcomes.clear();
                inner.opened_at = None;
                self.set_state(&mut inner, CircuitState::Closed);
            }
            CircuitState::Closed => {
                inner.outcomes.push_back((now, false));
                inner.prune(now, self.config.window);
            }
            // Late results from calls admitted before the last transition.
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        match inner.state {
            CircuitState::HalfOpen if trial => {
                warn!(circuit_breaker = %self.name, "trial call failed, reopening circuit");
                inner.trial_in_flight = false;
                inner.opened_at = Some(now);
                self.set_state(&mut inner, CircuitState::Open);
            }
            CircuitState::Closed => {
                inner.outcomes.push_back((now, true));
                inner.prune(now, self.config.window);

                let failures = inner.failures();
                let rate = failures as f64 / inner.outcomes.len() as f64;

                if failures as u32 >= self.config.failure_threshold
                    && rate >= self.config.failure_rate_threshold
                {
                    error!(
                        circuit_breaker = %self.name,
                        failures,
                        rate,
                        threshold = self.config.failure_threshold,
                        "failure threshold reached, opening circuit"
                    );
                    inner.outcomes.clear();
                    inner.opened_at = Some(now);
                    self.set_state(&mut inner, CircuitState::Open);
                }
            }
            _ => {}
        }
    }

    fn on_abandoned(&self, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            // Let the next caller run the trial instead.
            inner.trial_in_flight = false;
        }
    }

    fn set_state(&self, inner: &mut CircuitInner, state: CircuitState) {
        inner.state = state;
        self.state_gauge.set(state.as_gauge());
    }
}

/// Admission ticket for a single call. Settle it with the call outcome; a
/// permit dropped unsettled (e.g. the call was cancelled) records nothing.
#[must_use]
pub struct CircuitPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> CircuitPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn settle<T>(mut self, outcome: &Result<T, ServiceError>) {
        self.settled = true;
        match outcome {
            Err(err) if err.is_downstream_failure() => self.breaker.on_failure(self.trial),
            _ => self.breaker.on_success(self.trial),
        }
    }
}

impl Drop for CircuitPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.trial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            failure_rate_threshold: 0.5,
            window: Duration::from_secs(30),
            cooldown: Duration::from_secs(10),
        }
    }

    fn fail(cb: &CircuitBreaker) {
        let permit = cb.try_acquire().expect("circuit should admit");
        permit.settle::<()>(&Err(ServiceError::Unavailable("down".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new("product-service", config(3));

        fail(&cb);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Closed);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open);

        let err = cb.try_acquire().err().expect("open circuit must fail fast");
        assert!(matches!(err, ServiceError::CircuitOpen(name) if name == "product-service"));
    }

    #[tokio::test(start_paused = true)]
    async fn semantic_errors_do_not_trip_the_circuit() {
        let cb = CircuitBreaker::new("user-service", config(2));

        for _ in 0..5 {
            let permit = cb.try_acquire().unwrap();
            permit.settle::<()>(&Err(ServiceError::not_found()));
        }

        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_rate_below_threshold_keeps_circuit_closed() {
        let cb = CircuitBreaker::new("order-service", config(2));

        for _ in 0..3 {
            cb.try_acquire().unwrap().settle::<()>(&Ok(()));
        }
        fail(&cb);
        fail(&cb);

        // 2 failures out of 5 calls is 40%.
        assert_eq!(cb.state(), CircuitState::Closed);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_outside_window_are_forgotten() {
        let cb = CircuitBreaker::new("user-service", config(2));

        fail(&cb);
        tokio::time::advance(Duration::from_secs(31)).await;
        fail(&cb);

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().failures_in_window, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn admits_exactly_one_trial_after_cooldown() {
        let cb = CircuitBreaker::new("payment-service", config(1));
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cb.try_acquire().is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        let trial = cb.try_acquire().expect("trial should be admitted");
        assert!(trial.is_trial());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(matches!(cb.try_acquire(), Err(ServiceError::CircuitOpen(_))));

        trial.settle::<()>(&Ok(()));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trial_reopens_circuit() {
        let cb = CircuitBreaker::new("payment-service", config(1));
        fail(&cb);

        tokio::time::advance(Duration::from_secs(10)).await;
        let trial = cb.try_acquire().unwrap();
        trial.settle::<()>(&Err(ServiceError::Timeout("payment-service".into())));

        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.try_acquire().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_trial_frees_the_slot() {
        let cb = CircuitBreaker::new("product-service", config(1));
        fail(&cb);
        tokio::time::advance(Duration::from_secs(10)).await;

        let trial = cb.try_acquire().unwrap();
        drop(trial);

        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.try_acquire().unwrap().is_trial());
    }
}
