//! Retry-with-backoff policy shared by the fetcher and the translation pool.
//!
//! The delay between attempts follows:
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! Whether an error is worth retrying is the caller's call, passed in as a
//! predicate, so the one policy serves both HTTP fetching and the
//! translation API.

use rand::{Rng, rng};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

/// Backoff parameters. `max_attempts` counts the first try.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, E, Fut, Op, P>(&self, mut op: Op, retryable: P) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !retryable(&e) {
                        return Err(e);
                    }
                    if attempt >= self.max_attempts {
                        error!(
                            attempt,
                            max = self.max_attempts,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let shift = (attempt - 1).min(16) as u32;
                    let mut delay = self.base_delay.saturating_mul(1 << shift);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_attempts,
                        ?delay,
                        error = %e,
                        "attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_two_rate_limits_then_success_takes_three_attempts() {
        let attempts = AtomicUsize::new(0);
        let result: Result<&str, FetchError> = quick()
            .run(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n < 3 {
                            Err(FetchError::Http(429))
                        } else {
                            Ok("page body")
                        }
                    }
                },
                FetchError::is_transient,
            )
            .await;

        assert_eq!(result.unwrap(), "page body");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_fails_on_first_attempt() {
        let attempts = AtomicUsize::new(0);
        let result: Result<&str, FetchError> = quick()
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(FetchError::Http(404)) }
                },
                FetchError::is_transient,
            )
            .await;

        assert!(matches!(result, Err(FetchError::Http(404))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_configured_attempts() {
        let attempts = AtomicUsize::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<&str, FetchError> = policy
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(FetchError::Http(500)) }
                },
                FetchError::is_transient,
            )
            .await;

        assert!(matches!(result, Err(FetchError::Http(500))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let attempts = AtomicUsize::new(0);
        let result: Result<&str, FetchError> = quick()
            .run(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n == 1 {
                            Err(FetchError::Timeout)
                        } else {
                            Ok("recovered")
                        }
                    }
                },
                FetchError::is_transient,
            )
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
