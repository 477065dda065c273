//! Bounded, linear retry.
//!
//! Every attempt after the first waits the same fixed delay. There is no
//! exponential growth and no jitter: accounts run one at a time, so there is
//! no herd to spread out.

use crate::error::{OdysseyError, OdysseyResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to retry a failed operation, and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    /// Three retries, one second apart.
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Initial attempt plus retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> OdysseyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OdysseyResult<T>>,
    {
        self.run_while(label, |_| true, op).await
    }

    /// Like [`RetryPolicy::run`], but only retries errors for which
    /// `retryable` returns true. Other errors are returned as-is.
    pub async fn run_while<T, F, Fut, P>(
        &self,
        label: &str,
        retryable: P,
        mut op: F,
    ) -> OdysseyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OdysseyResult<T>>,
        P: Fn(&OdysseyError) -> bool,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !retryable(&e) => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    if self.max_retries == 0 {
                        return Err(e);
                    }
                    return Err(OdysseyError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let left = max_attempts - attempt;
                    warn!(label, attempt, retries_left = left, error = %e, "Retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
