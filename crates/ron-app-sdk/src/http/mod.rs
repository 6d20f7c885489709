//! HTTP layer
//!
//! Request descriptors, the transport seam, the single-attempt executor and
//! the concurrency gate that bounds in-flight attempts.

pub use gate::ConcurrencyGate;
pub use reqwest_transport::ReqwestTransport;
pub use request::{HttpMethod, Query, QueryValue, Request};
pub use transport::{
    ByteStream, StreamingResponse, Transport, TransportError, TransportRequest, TransportResponse,
};

pub(crate) mod executor;
mod gate;
mod reqwest_transport;
mod request;
mod transport;

// Re-export HTTP types from the http crate for convenience
pub use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
