//! The backoff strategy trait.

use std::time::Duration;

/// A policy deciding how long to wait between attempts.
///
/// `attempt` is 0-indexed and counts failures: `next_delay(0)` is the wait
/// after the first failed attempt, before the first retry.
///
/// # Examples
///
/// ```rust
/// use ron_app_sdk_core::retry::{BackoffStrategy, ExponentialBackoff, Jitter};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .max_retries(2)
///     .initial_delay(Duration::from_millis(100))
///     .jitter(Jitter::None)
///     .build();
///
/// assert_eq!(backoff.next_delay(0), Some(Duration::from_millis(100)));
/// assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(200)));
/// assert_eq!(backoff.next_delay(2), None);
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Delay before the retry following failure number `attempt` (0-indexed).
    ///
    /// Returns `None` once the retry budget is spent.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Maximum number of retries after the initial attempt.
    fn max_retries(&self) -> u32;

    /// Whether another retry is allowed after `attempt` failures (0-indexed).
    fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries()
    }
}
