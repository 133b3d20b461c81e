//! Call-with-retry primitive.
//!
//! The policy is an explicit value and the retryable test is a predicate
//! supplied at the call site, so nothing here knows about any one
//! provider's error types.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retry schedule for a single fallible call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Multiplier applied to the exponential term.
    pub base: Duration,
    /// Exponent base per attempt.
    pub factor: u32,
    /// Upper bound on any single wait.
    pub cap: Duration,
}

impl Default for RetryPolicy {
    /// 4 attempts; waits of base(1s) × 4^attempt, capped at 60s.
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base: Duration::from_secs(1),
            factor: 4,
            cap: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Wait before the retry following attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.factor.saturating_pow(attempt);
        self.base.saturating_mul(exp).min(self.cap)
    }
}

/// Run `op` until it succeeds, fails non-retryably, or attempts run out.
/// The final error is returned unchanged.
pub async fn call_with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && retryable(&err) => {
                let wait = policy.backoff(attempt);
                warn!(
                    attempt,
                    wait_secs = wait.as_secs(),
                    "retryable failure: {err}"
                );
                tokio::time::sleep(wait).await;
            }
            Err(err) => return Err(err),
        }
    }
}
