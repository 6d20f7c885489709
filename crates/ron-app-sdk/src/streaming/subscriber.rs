//! Reconnecting event subscription
//!
//! A [`Subscriber`] keeps one event stream alive across failures:
//!
//! ```text
//! Connecting -> Streaming -> (Backoff -> Connecting)* -> Stopped
//! ```
//!
//! Every reconnect sends the last observed event id as `Last-Event-ID`.
//! Resumption is best-effort: depending on the server, events around a
//! reconnect may be replayed or skipped. The subscriber itself hands each
//! received event to the callback once.

use super::Event;
use crate::client::RonClient;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use futures::StreamExt;
use ron_app_sdk_core::retry::{BackoffStrategy, ExponentialBackoff, Jitter};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reconnect policy and controls for [`Subscriber`].
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// Consecutive failures tolerated before giving up
    pub max_retries: u32,
    /// Backoff after the first failure
    pub initial_backoff: Duration,
    /// Cap on the pre-jitter backoff
    pub max_backoff: Duration,
    /// Resume from this event id on the first connection
    pub last_event_id: Option<String>,
    /// Stops the subscription when triggered
    pub cancel: Option<CancellationToken>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            last_event_id: None,
            cancel: None,
        }
    }
}

impl SubscribeOptions {
    /// Set the failure budget.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff window.
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Resume from `id` on the first connection.
    pub fn resume_from(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = Some(id.into());
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Where a [`Subscriber`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// Opening the stream
    Connecting,
    /// Delivering events
    Streaming,
    /// Waiting before the next connection
    Backoff,
    /// Finished, by cancellation or exhaustion
    Stopped,
}

/// Long-lived consumer of one event stream path.
#[derive(Debug)]
pub struct Subscriber {
    client: RonClient,
    path: String,
    backoff: ExponentialBackoff,
    cancel: Option<CancellationToken>,
    last_event_id: Option<String>,
    state: SubscriberState,
}

impl Subscriber {
    /// Create a subscriber; nothing happens until [`run`](Self::run).
    pub fn new(client: RonClient, path: impl Into<String>, options: SubscribeOptions) -> Self {
        let backoff = ExponentialBackoff::builder()
            .max_retries(options.max_retries)
            .initial_delay(options.initial_backoff)
            .max_delay(options.max_backoff)
            .multiplier(2.0)
            .jitter(Jitter::Proportional(0.5))
            .build();

        Self {
            client,
            path: path.into(),
            backoff,
            cancel: options.cancel,
            last_event_id: options.last_event_id,
            state: SubscriberState::Connecting,
        }
    }

    /// Id of the most recent event that carried one.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriberState {
        self.state
    }

    fn transition(&mut self, next: SubscriberState) {
        debug!(path = %self.path, from = ?self.state, to = ?next, "subscriber state change");
        self.state = next;
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Deliver events to `callback` until cancelled or out of retries.
    ///
    /// Returns `Ok(())` when cancelled. Once more consecutive failures than
    /// the budget allows have occurred, returns the last failure. A
    /// delivered event resets the failure count; a stream that simply ends
    /// counts as a failure. Configuration errors (such as a closed client)
    /// are returned immediately.
    pub async fn run<F, Fut>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(Event) -> Fut,
        Fut: Future<Output = ()>,
    {
        let cancel = self.cancel.clone();
        let mut failures = 0u32;

        loop {
            if self.is_cancelled() {
                info!(path = %self.path, "subscription cancelled");
                self.transition(SubscriberState::Stopped);
                return Ok(());
            }

            self.transition(SubscriberState::Connecting);
            let failure = match self
                .client
                .stream_events(&self.path, self.last_event_id.as_deref())
                .await
            {
                Err(error) => error,
                Ok(mut stream) => {
                    self.transition(SubscriberState::Streaming);
                    loop {
                        let next = tokio::select! {
                            biased;
                            _ = cancelled(cancel.as_ref()) => None,
                            next = stream.next() => Some(next),
                        };
                        match next {
                            None => {
                                info!(path = %self.path, "subscription cancelled");
                                self.transition(SubscriberState::Stopped);
                                return Ok(());
                            }
                            Some(Some(Ok(event))) => {
                                if let Some(id) = &event.id {
                                    self.last_event_id = Some(id.clone());
                                }
                                callback(event).await;
                                failures = 0;
                            }
                            Some(Some(Err(error))) => break error,
                            Some(None) => {
                                break Error::Network {
                                    message: "event stream ended".to_string(),
                                    method: HttpMethod::Get,
                                    path: self.path.clone(),
                                    status: None,
                                };
                            }
                        }
                    }
                }
            };

            if matches!(failure, Error::Config(_)) {
                self.transition(SubscriberState::Stopped);
                return Err(failure);
            }

            failures += 1;
            let Some(delay) = self.backoff.next_delay(failures - 1) else {
                warn!(path = %self.path, failures, error = %failure, "subscription giving up");
                self.transition(SubscriberState::Stopped);
                return Err(failure);
            };

            warn!(
                path = %self.path,
                failures,
                delay_ms = delay.as_millis() as u64,
                last_event_id = self.last_event_id.as_deref(),
                error = %failure,
                "event stream failed, reconnecting"
            );
            self.transition(SubscriberState::Backoff);
            tokio::select! {
                biased;
                _ = cancelled(cancel.as_ref()) => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Resolves when `token` fires; never, without a token.
async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
