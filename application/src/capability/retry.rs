//! Bounded retry for capability calls

use atlance_domain::{CapabilityError, CapabilityKind};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry and timeout settings for one kind of capability call.
///
/// The timeout applies to each attempt. Only retryable failures (timeouts
/// and upstream errors) are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Run `call` under `policy`, stopping early on cancellation.
///
/// `on_retry` receives the number of the attempt that just failed.
pub(crate) async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    capability: CapabilityKind,
    cancel: &CancellationToken,
    mut on_retry: impl FnMut(u32),
    mut call: F,
) -> Result<T, CapabilityError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CapabilityError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(CapabilityError::Cancelled { capability });
        }

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CapabilityError::Cancelled { capability }),
            outcome = tokio::time::timeout(policy.timeout, call()) => outcome,
        };

        let error = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => CapabilityError::Timeout {
                capability,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        };

        if !error.is_retryable() || attempt >= attempts {
            return Err(error);
        }

        warn!(
            "{} call failed (attempt {}/{}): {}; retrying",
            capability, attempt, attempts, error
        );
        on_retry(attempt);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CapabilityError::Cancelled { capability }),
            _ = tokio::time::sleep(policy.backoff) => {}
        }
        attempt += 1;
    }
}
