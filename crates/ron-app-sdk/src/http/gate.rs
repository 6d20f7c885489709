//! Concurrency bound for in-flight attempts

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Counting permit pool owned by one client.
///
/// Without a limit the gate is a pass-through. With one, callers wait
/// (without spinning) until a permit frees up. The permit is an RAII guard,
/// so it is returned on success, on error and when the future is dropped.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Option<Arc<Semaphore>>,
    limit: Option<usize>,
}

impl ConcurrencyGate {
    /// Create a gate. `None` or zero disables the bound.
    pub fn new(limit: Option<usize>) -> Self {
        let limit = limit.filter(|n| *n > 0);
        Self {
            semaphore: limit.map(|n| Arc::new(Semaphore::new(n))),
            limit,
        }
    }

    /// Configured bound.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Permits currently free, `None` when unbounded.
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Run `operation` while holding a permit.
    ///
    /// Fails with [`Error::Config`] if the gate was closed while waiting.
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = match &self.semaphore {
            Some(semaphore) => Some(
                semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::config("client is closed"))?,
            ),
            None => None,
        };
        operation().await
    }

    /// Wake every waiter with an error and refuse new acquisitions.
    pub fn close(&self) {
        if let Some(semaphore) = &self.semaphore {
            semaphore.close();
        }
    }
}
