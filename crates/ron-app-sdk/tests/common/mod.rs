//! Common test utilities and helpers

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use ron_app_sdk::http::{
    HeaderMap, StatusCode, StreamingResponse, Transport, TransportError, TransportRequest,
    TransportResponse,
};
use ron_app_sdk::{ClientConfig, RonClient};

/// Load a response fixture
pub fn load_response_fixture(name: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let path = Path::new(manifest_dir)
        .join("tests")
        .join("fixtures")
        .join("responses")
        .join(format!("{}.json", name));

    std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to load response fixture '{}' from {:?}: {}",
            name, path, e
        )
    })
}

/// Route SDK logs to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a test capability token
pub fn test_token() -> String {
    "cap-test-0123456789abcdef".to_string()
}

/// Configuration pointing at a local mock server
pub fn local_config(uri: &str) -> ClientConfig {
    ClientConfig::builder()
        .base_url(uri)
        .allow_insecure_http(true)
        .build()
}

type StreamScript = Result<(u16, Vec<Result<&'static str, TransportError>>), TransportError>;

/// Transport that replays scripted outcomes and records every request.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    requests: Mutex<Vec<TransportRequest>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold every unary exchange open for `delay` before answering.
    pub fn with_delay(&self, delay: Duration) -> &Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    /// Most unary exchanges seen in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Queue a buffered response.
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from(body.into()),
        }));
        self
    }

    /// Queue a transport failure for a unary exchange.
    pub fn fail(&self, error: TransportError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Queue a stream whose body yields `chunks` and then ends.
    pub fn stream(&self, status: u16, chunks: Vec<Result<&'static str, TransportError>>) -> &Self {
        self.streams.lock().unwrap().push_back(Ok((status, chunks)));
        self
    }

    /// Queue a failed stream handshake.
    pub fn fail_stream(&self, error: TransportError) -> &Self {
        self.streams.lock().unwrap().push_back(Err(error));
        self
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Header value of the n-th request.
    pub fn header(&self, index: usize, name: &str) -> Option<String> {
        self.requests()
            .get(index)
            .and_then(|r| r.headers.get(name))
            .map(|v| v.to_str().unwrap().to_string())
    }

    /// Query value of the n-th request.
    pub fn query(&self, index: usize, key: &str) -> Option<String> {
        self.requests().get(index).and_then(|r| {
            r.query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }

    /// Build a client over `transport`.
    pub fn client(self: &Arc<Self>, config: ClientConfig) -> RonClient {
        init_tracing();
        RonClient::builder()
            .config(config)
            .transport(Arc::clone(self) as Arc<dyn Transport>)
            .build()
            .unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted response".into())))
    }

    async fn open_stream(
        &self,
        request: TransportRequest,
    ) -> Result<StreamingResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted stream".into())));
        let (status, chunks) = script?;
        let body = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| chunk.map(|text| Bytes::from_static(text.as_bytes()))),
        );
        Ok(StreamingResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Box::pin(body),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
