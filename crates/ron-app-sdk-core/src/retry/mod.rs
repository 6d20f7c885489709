//! Backoff policies.
//!
//! # Key Types
//!
//! - [`BackoffStrategy`] - how long to wait before the next attempt, and when to stop
//! - [`ExponentialBackoff`] - exponential growth with an optional cap and jitter
//! - [`Jitter`] - how randomness is mixed into a computed delay
//!
//! The policies only compute delays. Sleeping, cancellation and error
//! classification belong to the caller, which keeps this crate runtime-free.

mod exponential;
mod strategy;

pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder, Jitter};
pub use strategy::BackoffStrategy;
