//! Transport trait for abstracting the wire
//!
//! The client never talks to an HTTP library directly. It hands a fully
//! resolved [`TransportRequest`] to a [`Transport`] and gets back either a
//! buffered response or a chunk stream. [`ReqwestTransport`](super::ReqwestTransport)
//! is the production implementation; tests plug in scripted transports.

use super::HttpMethod;
use crate::error::Error;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use http::{HeaderMap, StatusCode};
use std::fmt;
use thiserror::Error;

/// Failure below the HTTP status layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The deadline elapsed.
    #[error("timed out: {0}")]
    Timeout(String),

    /// DNS, connect, TLS or socket failure.
    #[error("{0}")]
    Network(String),
}

impl TransportError {
    /// Lift into the crate error for the request that failed.
    pub fn into_error(self, method: HttpMethod, path: &str) -> Error {
        match self {
            TransportError::Timeout(message) => Error::Timeout {
                message,
                method,
                path: path.to_string(),
            },
            TransportError::Network(message) => Error::Network {
                message,
                method,
                path: path.to_string(),
                status: None,
            },
        }
    }
}

/// Everything needed to perform one exchange.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the base URL, always starting with `/`
    pub path: String,
    /// Fully resolved headers, credentials included
    pub headers: HeaderMap,
    /// Encoded JSON body
    pub body: Option<Bytes>,
    /// Encoded query pairs
    pub query: Vec<(String, String)>,
}

/// A buffered response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Full body
    pub body: Bytes,
}

/// The chunk stream of a streaming response.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// A streaming response whose body has not been read yet.
pub struct StreamingResponse {
    /// HTTP status of the handshake
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Body chunks as they arrive
    pub body: ByteStream,
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs HTTP exchanges on behalf of the client.
///
/// Implementations own connection pooling and TLS. They must distinguish
/// deadline failures ([`TransportError::Timeout`]) from every other
/// transport failure ([`TransportError::Network`]) and must not interpret
/// HTTP statuses.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Perform one exchange and buffer the whole body.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Start a long-lived exchange and return the body as a chunk stream.
    ///
    /// No overall deadline applies to the body.
    async fn open_stream(
        &self,
        request: TransportRequest,
    ) -> Result<StreamingResponse, TransportError>;

    /// Name for logs.
    fn name(&self) -> &'static str;
}
