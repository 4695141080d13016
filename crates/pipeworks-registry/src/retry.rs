use std::time::Duration;

use tracing::{info_span, warn, Instrument};

use crate::error::{RegistryError, RegistryResult};

/// The fixed backoff schedule the Registry retries transient lock
/// contention with before surfacing `LockTimeout`: 0.5s, 1s, 2s, 4s, 8s,
/// five attempts in total.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ],
        }
    }
}

pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, op: F) -> RegistryResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = RegistryResult<T>>,
{
    let mut last_error = None;

    for (attempt, delay) in std::iter::once(None).chain(policy.backoff.iter().copied().map(Some)).enumerate() {
        if let Some(delay) = delay {
            warn!(operation, attempt, delay_ms = delay.as_millis() as u64, "registry write contended, retrying");
            tokio::time::sleep(delay).await;
        }

        let span = info_span!("registry_retry", operation, attempt);
        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(RegistryError::LockTimeout(last_error.map(|e| e.to_string()).unwrap_or_else(|| operation.to_string())))
}
