//! Main client implementation

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use http::header::{ACCEPT, CACHE_CONTROL};
use http::{HeaderName, HeaderValue};
use serde_json::Value;
use tracing::info;

use crate::{
    JsonObject,
    auth::{AuthResolver, ResolvedHeaders, TokenSource},
    config::ClientConfig,
    error::{Error, Result},
    http::{
        ConcurrencyGate, HttpMethod, Query, ReqwestTransport, Request, Transport,
        TransportError, TransportRequest, executor::RequestExecutor,
    },
    metrics::{MetricsSnapshot, RequestMetrics},
    observability::{AttemptLog, RequestTimer, StreamContext},
    pagination::Paginator,
    retry::RetryScheduler,
    streaming::{Event, EventStream, SubscribeOptions, Subscriber},
};

/// Resumption header sent on (re)connects.
pub const LAST_EVENT_ID_HEADER: HeaderName = HeaderName::from_static("last-event-id");

/// Client for a RON application gateway.
///
/// Cheap to clone; clones share the transport, permit pool, counters and
/// credentials. Each independently built client has its own.
///
/// # Example
///
/// ```rust,no_run
/// use ron_app_sdk::{ClientConfig, RonClient};
///
/// # async fn example() -> ron_app_sdk::Result<()> {
/// let client = RonClient::new(
///     ClientConfig::builder()
///         .base_url("https://gateway.example")
///         .token("cap-token")
///         .build(),
/// )?;
///
/// let hello = client.get("/app/hello").await?;
/// println!("{hello:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RonClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    executor: RequestExecutor,
    retry: RetryScheduler,
    gate: ConcurrencyGate,
    auth: RwLock<AuthResolver>,
    metrics: Arc<RequestMetrics>,
    closed: AtomicBool,
}

impl fmt::Debug for RonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RonClient")
            .field("base_url", &self.inner.config.base_url)
            .field("transport", &self.inner.transport.name())
            .field("max_retries", &self.inner.retry.max_retries())
            .field("max_concurrency", &self.inner.gate.limit())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl RonClient {
    /// Create a client from a configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the base URL is invalid or insecure without the
    /// override, or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Create a client from `RON_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a new client builder for advanced configuration.
    pub fn builder() -> RonClientBuilder {
        RonClientBuilder::default()
    }

    /// The configuration the client was built with (without its token).
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Counters for this client instance.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Close the client. Idempotent.
    ///
    /// Credentials are dropped, callers waiting for a permit are released
    /// with [`Error::Config`], and every later call fails the same way.
    /// Attempts already on the wire finish normally.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.gate.close();
        self.inner
            .auth
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!(base_url = %self.inner.config.base_url, "client closed");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::config("client is closed"))
        } else {
            Ok(())
        }
    }

    fn resolve_headers(&self, marked_idempotent: bool) -> Result<ResolvedHeaders> {
        self.inner
            .auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(marked_idempotent)
    }

    /// Execute a call and return the response object.
    ///
    /// Idempotent calls (safe method or [`Request::idempotent`]) are retried
    /// on timeouts and network failures; others are attempted once.
    pub async fn call(&self, request: Request) -> Result<JsonObject> {
        self.ensure_open()?;

        if !request.is_idempotent() {
            return self.attempt(&request).await;
        }

        let client = self;
        let request = &request;
        let metrics = &self.inner.metrics;
        self.inner
            .retry
            .run(
                move |_| client.attempt(request),
                |_| metrics.record_retry(),
            )
            .await
    }

    /// One attempt: permit, fresh headers, one exchange.
    async fn attempt(&self, request: &Request) -> Result<JsonObject> {
        self.ensure_open()?;
        self.inner
            .gate
            .run(move || async move {
                self.ensure_open()?;
                let resolved = self.resolve_headers(request.marked_idempotent())?;
                self.inner.executor.execute(request, resolved).await
            })
            .await
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> Result<JsonObject> {
        self.call(Request::get(path)).await
    }

    /// GET `path` with query parameters. Absent values are omitted.
    pub async fn get_with_query(&self, path: &str, query: Query) -> Result<JsonObject> {
        self.call(Request::get(path).with_query(query)).await
    }

    /// POST `body` to `path`. Not retried.
    pub async fn post(&self, path: &str, body: impl Into<Value>) -> Result<JsonObject> {
        self.call(Request::post(path).json(body)).await
    }

    /// PUT `body` to `path`. Not retried unless sent through [`call`](Self::call)
    /// with [`Request::idempotent`].
    pub async fn put(&self, path: &str, body: impl Into<Value>) -> Result<JsonObject> {
        self.call(Request::put(path).json(body)).await
    }

    /// DELETE `path`.
    pub async fn delete(&self, path: &str) -> Result<JsonObject> {
        self.call(Request::delete(path)).await
    }

    /// DELETE `path` with query parameters.
    pub async fn delete_with_query(&self, path: &str, query: Query) -> Result<JsonObject> {
        self.call(Request::delete(path).with_query(query)).await
    }

    /// Open an event stream on `path`.
    ///
    /// A non-success handshake status fails with [`Error::Network`] carrying
    /// the status, before any parsing. Streams do not take a concurrency
    /// permit.
    pub async fn stream_events(
        &self,
        path: &str,
        last_event_id: Option<&str>,
    ) -> Result<EventStream> {
        self.ensure_open()?;
        let method = HttpMethod::Get;

        let resolved = self.resolve_headers(false)?;
        let request_id = resolved.request_id.clone();
        let mut headers = resolved.into_headers();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if let Some(id) = last_event_id {
            let value = HeaderValue::from_str(id)
                .map_err(|_| Error::config(format!("invalid last event id {id:?}")))?;
            headers.insert(LAST_EVENT_ID_HEADER, value);
        }

        let log = AttemptLog {
            method,
            path,
            request_id: &request_id,
            body_size: None,
        };
        log.log_sending(&headers);

        let timer = RequestTimer::start();
        let metrics = &self.inner.metrics;
        let response = self
            .inner
            .transport
            .open_stream(TransportRequest {
                method,
                path: path.to_string(),
                headers,
                body: None,
                query: Vec::new(),
            })
            .await
            .map_err(|error| {
                if matches!(error, TransportError::Timeout(_)) {
                    metrics.record_timeout();
                } else {
                    metrics.record_network_error();
                }
                log.log_failure(timer.elapsed(), &error);
                error.into_error(method, path)
            })?;

        let status = response.status.as_u16();
        if !response.status.is_success() {
            metrics.record_network_error();
            let message = format!("event stream handshake failed with status {status}");
            log.log_failure(timer.elapsed(), &message);
            return Err(Error::Network {
                message,
                method,
                path: path.to_string(),
                status: Some(status),
            });
        }

        metrics.record_success();
        StreamContext::new(path).log_opened(status, last_event_id);
        Ok(EventStream::new(response.body, path))
    }

    /// Build a reconnecting subscriber for `path`.
    pub fn subscriber(&self, path: &str, options: SubscribeOptions) -> Subscriber {
        Subscriber::new(self.clone(), path, options)
    }

    /// Deliver the events of `path` to `callback`, reconnecting on failure,
    /// until cancelled (`Ok`) or out of retries (last error).
    pub async fn subscribe<F, Fut>(
        &self,
        path: &str,
        callback: F,
        options: SubscribeOptions,
    ) -> Result<()>
    where
        F: FnMut(Event) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.ensure_open()?;
        self.subscriber(path, options).run(callback).await
    }

    /// Walk the cursor-paginated collection at `path`.
    pub fn paginate(&self, path: &str, page_size: u32, query: Query) -> Paginator {
        Paginator::new(self.clone(), path, page_size, query)
    }
}

/// Builder for [`RonClient`].
#[derive(Default)]
pub struct RonClientBuilder {
    config: Option<ClientConfig>,
    token_source: Option<Arc<dyn TokenSource>>,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for RonClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RonClientBuilder")
            .field("config", &self.config)
            .field("token_source", &self.token_source.is_some())
            .field("transport", &self.transport.as_ref().map(|t| t.name()))
            .finish()
    }
}

impl RonClientBuilder {
    /// Use `config` (defaults otherwise).
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Ask `source` for a token on every attempt; wins over the static token.
    pub fn token_source(mut self, source: impl TokenSource + 'static) -> Self {
        self.token_source = Some(Arc::new(source));
        self
    }

    /// Replace the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<RonClient> {
        let mut config = self.config.unwrap_or_default();
        config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };

        let auth = AuthResolver::new(config.token.take(), self.token_source);
        let metrics = Arc::new(RequestMetrics::new());
        let executor = RequestExecutor::new(
            Arc::clone(&transport),
            Arc::clone(&metrics),
            config.max_response_bytes,
        );

        Ok(RonClient {
            inner: Arc::new(ClientInner {
                retry: RetryScheduler::new(config.max_retries),
                gate: ConcurrencyGate::new(config.effective_concurrency()),
                auth: RwLock::new(auth),
                closed: AtomicBool::new(false),
                transport,
                executor,
                metrics,
                config,
            }),
        })
    }
}
