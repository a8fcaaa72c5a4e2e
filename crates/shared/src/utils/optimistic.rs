use crate::errors::{RepositoryError, ServiceError};
use std::future::Future;
use tracing::warn;

pub const OPTIMISTIC_LOCK_ATTEMPTS: u32 = 3;

/// Re-runs a read-modify-write step while its versioned write loses the race.
/// The step must re-read the row on every call. After the last attempt the
/// conflict is returned to the caller.
pub async fn retry_on_conflict<T, F, Fut>(operation: &str, mut step: F) -> Result<T, ServiceError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match step(attempt).await {
            Err(ServiceError::Repo(RepositoryError::Conflict(reason)))
                if attempt < OPTIMISTIC_LOCK_ATTEMPTS =>
            {
                warn!(operation, attempt, %reason, "version conflict, re-reading");
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeds_once_the_race_is_won() {
        let result = retry_on_conflict("update_user", |attempt| async move {
            if attempt < 3 {
                Err(ServiceError::Repo(RepositoryError::Conflict("stale".into())))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn surfaces_conflict_after_three_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = retry_on_conflict("update_user", |_| {
            calls += 1;
            async { Err(ServiceError::Repo(RepositoryError::Conflict("stale".into()))) }
        })
        .await;

        assert!(matches!(
            result,
            Err(ServiceError::Repo(RepositoryError::Conflict(_)))
        ));
        assert_eq!(calls, OPTIMISTIC_LOCK_ATTEMPTS);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = retry_on_conflict("update_user", |_| {
            calls += 1;
            async { Err(ServiceError::not_found()) }
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls, 1);
    }
}
