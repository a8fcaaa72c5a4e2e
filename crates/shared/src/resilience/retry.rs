use crate::config::RetryConfig;
use std::time::Duration;

impl RetryConfig {
    /// Delay before the attempt following failed attempt number `attempt`
    /// (1-based), capped at `max_backoff`. Jitter adds up to 25%.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = base.min(self.max_backoff.as_millis() as f64);

        let mut delay = Duration::from_millis(capped as u64);

        if self.jitter {
            let jitter = (delay.as_millis() as f64 * 0.25 * rand::random::<f64>()) as u64;
            delay += Duration::from_millis(jitter);
        }

        delay
    }

    pub fn should_retry(&self, attempt: u32, err: &crate::errors::ServiceError) -> bool {
        attempt < self.max_attempts && err.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;

    fn config() -> RetryConfig {
        RetryConfig {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn backoff_grows_exponentially_and_is_capped() {
        let retry = config();
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(3), Duration::from_millis(400));
        assert_eq!(retry.backoff(4), Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let retry = RetryConfig {
            jitter: true,
            ..config()
        };
        for _ in 0..50 {
            let delay = retry.backoff(2);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[test]
    fn only_transient_errors_are_retried() {
        let retry = config();
        assert!(retry.should_retry(1, &ServiceError::Unavailable("down".into())));
        assert!(retry.should_retry(3, &ServiceError::Timeout("user-service".into())));
        assert!(!retry.should_retry(4, &ServiceError::Timeout("user-service".into())));
        assert!(!retry.should_retry(1, &ServiceError::validation("bad")));
        assert!(!retry.should_retry(1, &ServiceError::not_found()));
        assert!(!retry.should_retry(1, &ServiceError::CircuitOpen("x".into())));
    }
}
