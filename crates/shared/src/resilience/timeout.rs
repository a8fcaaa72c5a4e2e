use crate::errors::ServiceError;
use std::{future::Future, time::Duration};

/// Bounds a single attempt. `None` means no limit.
pub async fn with_timeout<T, F>(
    target: &str,
    limit: Option<Duration>,
    call: F,
) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(ServiceError::Timeout(target.to_string()))),
        None => call.await,
    }
}
