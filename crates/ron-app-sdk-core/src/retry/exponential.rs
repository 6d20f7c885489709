//! Exponential backoff with jitter.

use super::strategy::BackoffStrategy;
use rand::Rng;
use std::time::Duration;

/// How randomness is mixed into a computed delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jitter {
    /// Use the computed delay as-is.
    None,
    /// Add a uniform random amount in `[0, max)` to the delay.
    Additive(Duration),
    /// Scale the delay by a uniform factor in `[1 - f, 1 + f]`.
    ///
    /// `f` is clamped to `0.0..=1.0`.
    Proportional(f64),
}

/// Exponential backoff with an optional cap and configurable jitter.
///
/// # Mathematical Formula
///
/// For failure `n` (0-indexed):
/// ```text
/// base_delay   = initial_delay * multiplier^n
/// capped_delay = min(base_delay, max_delay)        // when a cap is set
/// final_delay  = jitter(capped_delay)
/// ```
///
/// Request retries use `Jitter::Additive(200ms)` over a 200ms initial delay,
/// stream reconnects use `Jitter::Proportional(0.5)` under a cap.
///
/// # Examples
///
/// ```rust
/// use ron_app_sdk_core::retry::{BackoffStrategy, ExponentialBackoff, Jitter};
/// use std::time::Duration;
///
/// let reconnect = ExponentialBackoff::builder()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(500))
///     .max_delay(Duration::from_secs(10))
///     .jitter(Jitter::Proportional(0.5))
///     .build();
///
/// let delay = reconnect.next_delay(0).unwrap();
/// assert!(delay >= Duration::from_millis(250));
/// assert!(delay <= Duration::from_millis(750));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Option<Duration>,
    multiplier: f64,
    jitter: Jitter,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Delay for failure `attempt` before jitter is applied, after the cap.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let raw = Duration::try_from_secs_f64(raw).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }

    /// The configured jitter mode.
    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::thread_rng();
        match self.jitter {
            Jitter::None => delay,
            Jitter::Additive(max) if max.is_zero() => delay,
            Jitter::Additive(max) => {
                let extra = rng.gen_range(0.0..max.as_secs_f64());
                delay.saturating_add(Duration::from_secs_f64(extra))
            }
            Jitter::Proportional(fraction) => {
                let fraction = fraction.clamp(0.0, 1.0);
                if fraction == 0.0 {
                    return delay;
                }
                let factor = rng.gen_range((1.0 - fraction)..=(1.0 + fraction));
                Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
            }
        }
    }
}

impl Default for ExponentialBackoff {
    /// Defaults match request retries:
    /// - `max_retries`: 3
    /// - `initial_delay`: 200ms
    /// - `max_delay`: none
    /// - `multiplier`: 2.0
    /// - `jitter`: additive, up to 200ms
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: None,
            multiplier: 2.0,
            jitter: Jitter::Additive(Duration::from_millis(200)),
        }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let delay = self.apply_jitter(self.base_delay(attempt));
        #[cfg(feature = "tracing")]
        tracing::trace!(attempt, delay_ms = delay.as_millis() as u64, "computed backoff delay");
        Some(delay)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Builder for configuring [`ExponentialBackoff`].
///
/// Unset parameters fall back to the [`Default`] values.
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    max_retries: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<Jitter>,
}

impl ExponentialBackoffBuilder {
    /// Set the maximum number of retries after the initial attempt.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Cap the pre-jitter delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier. Values below 1.0 are raised to 1.0.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier.max(1.0));
        self
    }

    /// Set the jitter mode.
    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Build the `ExponentialBackoff` instance.
    pub fn build(self) -> ExponentialBackoff {
        let defaults = ExponentialBackoff::default();
        ExponentialBackoff {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
            max_delay: self.max_delay.or(defaults.max_delay),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
            jitter: self.jitter.unwrap_or(defaults.jitter),
        }
    }
}
