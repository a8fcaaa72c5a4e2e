//! Timeout, retry and circuit breaking for outbound calls.
//!
//! `Resilience` composes the three policies around a call as
//! `retry(circuit_breaker(timeout(call)))`: every attempt asks the breaker
//! for a permit, is bounded by the timeout, and only transport failures are
//! retried. An open circuit is reported immediately and never retried.

mod circuit_breaker;
mod retry;
mod timeout;

pub use self::circuit_breaker::{CircuitBreaker, CircuitBreakerStats, CircuitPermit, CircuitState};
pub use self::timeout::with_timeout;

use crate::{
    config::{ResilienceConfig, RetryConfig},
    errors::ServiceError,
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Resilience {
    target: Arc<str>,
    timeout: Option<Duration>,
    retry: RetryConfig,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl Resilience {
    /// A pass-through policy for `target`; add stages with the `with_*` builders.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: Arc::from(target.into()),
            timeout: None,
            retry: RetryConfig::no_retry(),
            breaker: None,
        }
    }

    /// All three stages configured from `config`, with a fresh breaker for `target`.
    pub fn from_config(target: impl Into<String>, config: &ResilienceConfig) -> Self {
        let target = target.into();
        let breaker = Arc::new(CircuitBreaker::new(target.clone(), config.breaker.clone()));

        Self::new(target)
            .with_timeout(config.timeout)
            .with_retry(config.retry.clone())
            .with_circuit_breaker(breaker)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// The same timeout and breaker with a single attempt, for calls that are
    /// not safe to send twice.
    pub fn without_retry(&self) -> Self {
        Self {
            retry: RetryConfig::no_retry(),
            ..self.clone()
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.breaker.as_ref()
    }

    pub async fn call<T, F, Fut>(&self, operation: &str, call: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        self.call_cancellable(operation, &CancellationToken::new(), call)
            .await
    }

    /// Like [`Resilience::call`], but stops as soon as `cancel` fires: the
    /// in-flight attempt is dropped and no further attempts are made.
    pub async fn call_cancellable<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(ServiceError::Cancelled(self.target.to_string()));
            }

            let permit = match &self.breaker {
                Some(breaker) => Some(breaker.try_acquire()?),
                None => None,
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = with_timeout(&self.target, self.timeout, call()) => Some(result),
            };

            let Some(outcome) = outcome else {
                debug!(target_service = %self.target, operation, attempt, "call cancelled");
                return Err(ServiceError::Cancelled(self.target.to_string()));
            };

            if let Some(permit) = permit {
                permit.settle(&outcome);
            }

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            target_service = %self.target,
                            operation,
                            attempt,
                            "call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if self.retry.should_retry(attempt, &err) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        target_service = %self.target,
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Err(ServiceError::Cancelled(self.target.to_string()));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs the call and hands availability failures (`CircuitOpen`,
    /// `Timeout`, exhausted `Unavailable`) to `fallback`, which either
    /// produces a substitute value or returns the error to propagate.
    pub async fn call_with_fallback<T, F, Fut, FB>(
        &self,
        operation: &str,
        call: F,
        fallback: FB,
    ) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
        FB: FnOnce(ServiceError) -> Result<T, ServiceError>,
    {
        match self.call(operation, call).await {
            Err(err @ (ServiceError::CircuitOpen(_)
            | ServiceError::Timeout(_)
            | ServiceError::Unavailable(_))) => {
                warn!(
                    target_service = %self.target,
                    operation,
                    error = %err,
                    "invoking fallback"
                );
                fallback(err)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            multiplier: 2.0,
            jitter: false,
        }
    }

    fn breaker(threshold: u32) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            "product-service",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                failure_rate_threshold: 0.5,
                window: Duration::from_secs(60),
                cooldown: Duration::from_secs(5),
            },
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_last_allowed_attempt_without_surfacing_errors() {
        let policy = Resilience::new("product-service").with_retry(retry(3));
        let attempts = AtomicU32::new(0);

        let result = policy
            .call("find_by_id", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(ServiceError::Unavailable("connection refused".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_max_attempts() {
        let policy = Resilience::new("product-service").with_retry(retry(3));
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .call("find_by_id", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::Unavailable("connection refused".into())) }
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn semantic_errors_are_not_retried() {
        let policy = Resilience::new("user-service").with_retry(retry(5));
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .call("find_by_id", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::validation("email: invalid")) }
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_time_out_and_are_retried() {
        let policy = Resilience::new("payment-service")
            .with_timeout(Duration::from_millis(100))
            .with_retry(retry(2));
        let attempts = AtomicU32::new(0);

        let result = policy
            .call("capture", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 1 {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    Ok::<_, ServiceError>("captured")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "captured");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_copy_keeps_timeout_and_breaker() {
        let shared = breaker(3);
        let policy = Resilience::new("user-service")
            .with_timeout(Duration::from_millis(100))
            .with_retry(retry(3))
            .with_circuit_breaker(shared.clone());
        let once = policy.without_retry();
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = once
            .call("create", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(shared.stats().failures_in_window, 1);
        assert_eq!(once.target(), policy.target());
    }

    #[tokio::test(start_paused = true)]
    async fn reports_timeout_when_every_attempt_is_slow() {
        let policy = Resilience::new("payment-service")
            .with_timeout(Duration::from_millis(100))
            .with_retry(retry(2));

        let result: Result<(), _> = policy
            .call("capture", || async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout(target)) if target == "payment-service"));
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_fails_fast_without_invoking_the_call() {
        let policy = Resilience::new("product-service")
            .with_retry(retry(1))
            .with_circuit_breaker(breaker(2));
        let attempts = AtomicU32::new(0);

        for _ in 0..2 {
            let _: Result<(), _> = policy
                .call("reserve_stock", || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(ServiceError::Unavailable("down".into())) }
                })
                .await;
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        let result: Result<(), _> = policy
            .call("reserve_stock", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(ServiceError::CircuitOpen(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_once_the_circuit_opens() {
        let policy = Resilience::new("product-service")
            .with_retry(retry(5))
            .with_circuit_breaker(breaker(2));
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .call("reserve_stock", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::Unavailable("down".into())) }
            })
            .await;

        assert!(matches!(result, Err(ServiceError::CircuitOpen(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_state_is_shared_between_callers() {
        let shared = breaker(1);
        let a = Resilience::new("product-service").with_circuit_breaker(shared.clone());
        let b = Resilience::new("product-service").with_circuit_breaker(shared.clone());

        let _: Result<(), _> = a
            .call("find_by_id", || async {
                Err(ServiceError::Unavailable("down".into()))
            })
            .await;
        assert_eq!(shared.state(), CircuitState::Open);

        let blocked = b.call("find_by_id", || async { Ok::<_, ServiceError>(()) }).await;
        assert!(matches!(blocked, Err(ServiceError::CircuitOpen(_))));

        tokio::time::advance(Duration::from_secs(5)).await;

        let trial = a
            .call("find_by_id", || async { Ok::<_, ServiceError>(()) })
            .await;
        assert!(trial.is_ok());
        assert_eq!(shared.state(), CircuitState::Closed);

        let result = b.call("find_by_id", || async { Ok::<_, ServiceError>(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_retry_loop() {
        let policy = Resilience::new("payment-service").with_retry(RetryConfig {
            initial_backoff: Duration::from_secs(10),
            ..retry(5)
        });
        let attempts = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn({
            let policy = policy.clone();
            let attempts = attempts.clone();
            let cancel = cancel.clone();
            async move {
                policy
                    .call_cancellable("capture", &cancel, || {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        async { Err::<(), _>(ServiceError::Unavailable("down".into())) }
                    })
                    .await
            }
        });

        while attempts.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ServiceError::Cancelled(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_replaces_availability_failures_only() {
        let policy = Resilience::new("user-service")
            .with_retry(retry(1))
            .with_circuit_breaker(breaker(1));

        let first = policy
            .call_with_fallback(
                "find_by_id",
                || async { Err::<&str, _>(ServiceError::Unavailable("down".into())) },
                |_| Ok("cached"),
            )
            .await;
        assert_eq!(first.unwrap(), "cached");

        let second = policy
            .call_with_fallback(
                "find_by_id",
                || async { Ok::<_, ServiceError>("fresh") },
                |err| match err {
                    ServiceError::CircuitOpen(_) => Ok("cached"),
                    other => Err(other),
                },
            )
            .await;
        assert_eq!(second.unwrap(), "cached");

        let healthy = Resilience::new("order-service");
        let semantic = healthy
            .call_with_fallback(
                "find_by_id",
                || async { Err::<&str, _>(ServiceError::not_found()) },
                |_| Ok("cached"),
            )
            .await;
        assert!(semantic.unwrap_err().is_not_found());
    }
}
