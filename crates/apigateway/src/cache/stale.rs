use crate::domain::Fetched;
use lru::LruCache;
use parking_lot::Mutex;
use shared::{domain::responses::ApiResponse, errors::ServiceError};
use std::num::NonZeroUsize;
use tracing::{debug, warn};

/// Last successfully fetched copy of each entity, keyed by id. Only read when
/// the owning service cannot answer.
pub struct StaleCache<T> {
    resource: &'static str,
    entries: Mutex<LruCache<i32, ApiResponse<T>>>,
}

impl<T: Clone> StaleCache<T> {
    pub fn new(resource: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            resource,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn put(&self, id: i32, response: ApiResponse<T>) {
        self.entries.lock().put(id, response);
    }

    pub fn get(&self, id: i32) -> Option<ApiResponse<T>> {
        self.entries.lock().get(&id).cloned()
    }

    pub fn invalidate(&self, id: i32) {
        if self.entries.lock().pop(&id).is_some() {
            debug!(resource = self.resource, id, "dropped cached copy");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remembers fresh reads; stale replays are passed through untouched.
    pub fn remember(&self, id: i32, fetched: &Fetched<T>) {
        if !fetched.stale {
            self.put(id, fetched.response.clone());
        }
    }

    /// Fallback for a failed read of `id`. Serves the cached copy only when
    /// the upstream is unreachable (`CircuitOpen` or `Timeout`) and a copy
    /// exists; every other error is returned as is.
    pub fn fallback(&self, id: i32, err: ServiceError) -> Result<Fetched<T>, ServiceError> {
        if !matches!(err, ServiceError::CircuitOpen(_) | ServiceError::Timeout(_)) {
            return Err(err);
        }

        match self.get(id) {
            Some(response) => {
                warn!(
                    resource = self.resource,
                    id,
                    error = %err,
                    "serving stale copy"
                );
                Ok(Fetched::stale(response))
            }
            None => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{
        config::CircuitBreakerConfig,
        resilience::{CircuitBreaker, Resilience},
    };
    use std::{sync::Arc, time::Duration};

    fn response(name: &str) -> ApiResponse<String> {
        ApiResponse::success("Product fetched", name.to_string())
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = StaleCache::new("products", 2);
        cache.put(1, response("a"));
        cache.put(2, response("b"));
        assert!(cache.get(1).is_some());

        cache.put(3, response("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn only_unreachable_upstreams_fall_back() {
        let cache = StaleCache::new("products", 8);
        cache.put(1, response("widget"));

        let stale = cache
            .fallback(1, ServiceError::CircuitOpen("product-service".into()))
            .unwrap();
        assert!(stale.stale);
        assert_eq!(stale.response.data, "widget");

        assert!(
            cache
                .fallback(1, ServiceError::Timeout("product-service".into()))
                .is_ok()
        );

        let not_found = cache.fallback(1, ServiceError::not_found()).unwrap_err();
        assert!(not_found.is_not_found());

        let unavailable = cache
            .fallback(1, ServiceError::Unavailable("connection refused".into()))
            .unwrap_err();
        assert!(matches!(unavailable, ServiceError::Unavailable(_)));

        let missing = cache
            .fallback(2, ServiceError::CircuitOpen("product-service".into()))
            .unwrap_err();
        assert!(matches!(missing, ServiceError::CircuitOpen(_)));
    }

    #[test]
    fn stale_replays_are_not_remembered() {
        let cache = StaleCache::new("products", 8);
        cache.remember(1, &Fetched::stale(response("old")));
        assert!(cache.is_empty());

        cache.remember(1, &Fetched::fresh(response("new")));
        assert_eq!(cache.get(1).unwrap().data, "new");

        cache.invalidate(1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn open_circuit_serves_the_last_good_copy() {
        let breaker = Arc::new(CircuitBreaker::new(
            "product-service",
            CircuitBreakerConfig {
                failure_threshold: 1,
                failure_rate_threshold: 0.5,
                window: Duration::from_secs(60),
                cooldown: Duration::from_secs(60),
            },
        ));
        let policy = Resilience::new("product-service").with_circuit_breaker(breaker);
        let cache = StaleCache::new("products", 8);

        let fresh = policy
            .call_with_fallback(
                "find_by_id",
                || async { Ok(Fetched::fresh(response("widget"))) },
                |err| cache.fallback(1, err),
            )
            .await
            .unwrap();
        cache.remember(1, &fresh);

        let failed: Result<Fetched<String>, ServiceError> = policy
            .call("find_by_id", || async {
                Err(ServiceError::Internal("boom".into()))
            })
            .await;
        assert!(failed.is_err());

        let served = policy
            .call_with_fallback(
                "find_by_id",
                || async { Ok(Fetched::fresh(response("never called"))) },
                |err| cache.fallback(1, err),
            )
            .await
            .unwrap();

        assert!(served.stale);
        assert_eq!(served.response.data, "widget");
    }
}
