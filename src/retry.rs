/// Bounded retry with backoff
///
/// Shared by the write path: every durable write that may hit a transient
/// store failure goes through here rather than hand-rolling a sleep loop.
/// The attempt count is strictly bounded because the platform imposes a
/// hard wall-clock budget per request.
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy: how many extra attempts after the first, and the delay
/// before attempt `n` (1-based over the retries).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Linear backoff: base, 2*base, 3*base, ...
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * (attempt + 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Run `op` up to `1 + max_retries` times, sleeping between attempts.
///
/// Returns the first success, or the error from the final attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries => {
                warn!(
                    operation,
                    attempt = attempt + 1,
                    "retrying after failure: {}",
                    err
                );
                tokio::time::sleep(policy.delay_for(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
