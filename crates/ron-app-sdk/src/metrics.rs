//! Per-client request counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters owned by one client instance.
///
/// Every attempt lands in exactly one of success, error (status 400 or
/// above), timeout or network error, and always bumps `requests`.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    network_errors: AtomicU64,
    retries: AtomicU64,
}

/// Point-in-time copy of [`RequestMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Attempts started
    pub requests: u64,
    /// Responses with status 400 or above
    pub errors: u64,
    /// Attempts that hit a deadline
    pub timeouts: u64,
    /// Transport failures and oversized responses
    pub network_errors: u64,
    /// Backoff delays taken before a retry
    pub retries: u64,
}

impl RequestMetrics {
    /// Fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// An attempt completed with a status below 400.
    pub fn record_success(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// An attempt completed with status 400 or above.
    pub fn record_error(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// An attempt timed out.
    pub fn record_timeout(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// An attempt failed below HTTP or returned an oversized body.
    pub fn record_network_error(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.network_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A backoff delay was scheduled.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}
