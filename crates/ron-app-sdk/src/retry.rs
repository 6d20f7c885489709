//! Bounded retries for idempotent calls
//!
//! Only [`Error::Timeout`] and [`Error::Network`] are retried. The delay
//! before retry `k` (1-based) is `0.2s * 2^(k-1)` plus up to 0.2s of
//! uniform jitter. When the budget runs out the last error is returned
//! unchanged.

use crate::error::{Error, Result};
use ron_app_sdk_core::retry::{BackoffStrategy, ExponentialBackoff, Jitter};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Base delay before the first retry.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Upper bound (exclusive) of the additive jitter.
pub const RETRY_JITTER: Duration = Duration::from_millis(200);

/// A backoff the scheduler is about to sleep through.
#[derive(Debug)]
pub struct RetryBackoff<'a> {
    /// 1-based number of the attempt that just failed
    pub failed_attempt: u32,
    /// Time until the next attempt
    pub delay: Duration,
    /// Why the attempt failed
    pub error: &'a Error,
}

/// Drives the attempts of one logical call.
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    backoff: ExponentialBackoff,
}

impl RetryScheduler {
    /// Scheduler allowing `max_retries` retries after the first attempt.
    pub fn new(max_retries: u32) -> Self {
        Self {
            backoff: ExponentialBackoff::builder()
                .max_retries(max_retries)
                .initial_delay(RETRY_BASE_DELAY)
                .multiplier(2.0)
                .jitter(Jitter::Additive(RETRY_JITTER))
                .build(),
        }
    }

    /// Scheduler with a custom backoff policy.
    pub fn with_backoff(backoff: ExponentialBackoff) -> Self {
        Self { backoff }
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.backoff.max_retries()
    }

    /// Run `operation` until it succeeds, fails definitively or the budget
    /// is spent.
    ///
    /// `operation` receives the 1-based attempt number. `on_backoff` is
    /// called once per delay, before sleeping.
    pub async fn run<F, Fut, T, O>(&self, mut operation: F, mut on_backoff: O) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        O: FnMut(RetryBackoff<'_>),
    {
        let mut failures = 0u32;
        loop {
            let attempt = failures + 1;
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            let Some(delay) = self.backoff.next_delay(failures) else {
                warn!(attempts = attempt, error = %error, "retry budget exhausted");
                return Err(error);
            };

            debug!(
                failed_attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after backoff"
            );
            on_backoff(RetryBackoff {
                failed_attempt: attempt,
                delay,
                error: &error,
            });
            tokio::time::sleep(delay).await;
            failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn network() -> Error {
        Error::Network {
            message: "connection reset".into(),
            method: HttpMethod::Get,
            path: "/x".into(),
            status: None,
        }
    }

    fn timeout() -> Error {
        Error::Timeout {
            message: "deadline".into(),
            method: HttpMethod::Get,
            path: "/x".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success() {
        let scheduler = RetryScheduler::new(3);
        let calls = AtomicU32::new(0);
        let mut delays = Vec::new();

        let result = scheduler
            .run(
                |_| {
                    let seen = calls.fetch_add(1, Ordering::SeqCst);
                    async move { if seen < 2 { Err(network()) } else { Ok("done") } }
                },
                |backoff| delays.push((backoff.failed_attempt, backoff.delay)),
            )
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(delays.len(), 2);
        assert_eq!(delays[0].0, 1);
        assert!((Duration::from_millis(200)..Duration::from_millis(400)).contains(&delays[0].1));
        assert!((Duration::from_millis(400)..Duration::from_millis(600)).contains(&delays[1].1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let scheduler = RetryScheduler::new(2);
        let calls = AtomicU32::new(0);

        let result: Result<()> = scheduler
            .run(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { if attempt < 3 { Err(network()) } else { Err(timeout()) } }
                },
                |_| {},
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_matches!(result, Err(Error::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_definitive_errors_are_not_retried() {
        let scheduler = RetryScheduler::new(5);
        let calls = AtomicU32::new(0);
        let mut backoffs = 0;

        let result: Result<()> = scheduler
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err(Error::Auth {
                            status: 401,
                            method: HttpMethod::Get,
                            path: "/x".into(),
                        })
                    }
                },
                |_| backoffs += 1,
            )
            .await;

        assert_matches!(result, Err(Error::Auth { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(backoffs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_makes_one_attempt() {
        let scheduler = RetryScheduler::new(0);
        let calls = AtomicU32::new(0);

        let result: Result<()> = scheduler
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(network()) }
                },
                |_| {},
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
