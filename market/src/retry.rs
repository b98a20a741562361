//! Bounded retry loop.

use std::future::Future;
use std::time::Duration;

use crate::MarketError;

/// At most `max_attempts` tries; before try `n` (0-based) the loop sleeps
/// `n * backoff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(10),
        }
    }
}

/// Run `op` until it succeeds or the policy is used up.
///
/// `op` receives the 0-based attempt number. The terminal failure is always
/// [`MarketError::Exhausted`] wrapping the last error.
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, MarketError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, MarketError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last = None;
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff * attempt).await;
        }
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(attempt = attempt + 1, max = attempts, "price fetch failed: {e}");
                last = Some(e);
            }
        }
    }
    Err(MarketError::Exhausted {
        attempts,
        last: Box::new(last.unwrap_or_else(|| MarketError::Request("no attempt made".into()))),
    })
}
