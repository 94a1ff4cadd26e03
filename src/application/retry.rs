//! Linear-backoff retry policy.
//!
//! Every failure is retried the same way: a 4xx from upstream waits and retries exactly
//! like a timeout does.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tracing::warn;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_STEP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Delay after failed attempt `i` is `step * (i + 1)`.
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            step: DEFAULT_STEP,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, step: Duration) -> Self {
        Self { max_retries, step }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            step: Duration::ZERO,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff to wait after the attempt at `attempt_index` (zero-based) failed.
    pub fn delay_after(&self, attempt_index: u32) -> Duration {
        self.step.saturating_mul(attempt_index.saturating_add(1))
    }

    /// Run `attempt` until it succeeds or the policy is exhausted, returning the last error.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut index = 0;
        loop {
            counter!("spaceproxy_upstream_attempt_total").increment(1);
            match attempt(index).await {
                Ok(value) => return Ok(value),
                Err(err) if index >= self.max_retries => {
                    counter!("spaceproxy_upstream_failure_total").increment(1);
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_after(index);
                    warn!(
                        target = "spaceproxy::upstream::retry",
                        operation,
                        attempt = index + 1,
                        of = self.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "upstream attempt failed, backing off"
                    );
                    counter!("spaceproxy_upstream_retry_total").increment(1);
                    tokio::time::sleep(delay).await;
                    index += 1;
                }
            }
        }
    }
}
