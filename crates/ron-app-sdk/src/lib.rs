//! # RON App SDK
//!
//! Async Rust client for RON application gateways:
//! - JSON calls with structured problem errors
//! - Automatic retries for idempotent calls
//! - Bounded concurrency
//! - Cursor pagination
//! - Server-sent events with reconnect and `Last-Event-ID` resumption
//! - Capability tokens that never reach the logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ron_app_sdk::{ClientConfig, Request, RonClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RonClient::new(
//!         ClientConfig::builder()
//!             .base_url("https://gateway.example")
//!             .token("cap-token")
//!             .max_concurrency(8)
//!             .build(),
//!     )?;
//!
//!     let created = client
//!         .call(
//!             Request::put("/app/kv/greeting")
//!                 .json(json!({ "value": "hello" }))
//!                 .idempotent(true),
//!         )
//!         .await?;
//!     println!("{created:?}");
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export commonly used types
pub use auth::TokenSource;
pub use client::{RonClient, RonClientBuilder};
pub use config::ClientConfig;
pub use error::{Error, ErrorKind, Problem, Result};
pub use facet::FacetClient;
pub use http::{HttpMethod, Query, QueryValue, Request};
pub use metrics::MetricsSnapshot;
pub use pagination::{Page, Paginator};
pub use streaming::{Event, EventStream, SubscribeOptions, Subscriber, SubscriberState};

// Module declarations
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod facet;
pub mod http;
pub mod metrics;
pub mod observability;
pub mod pagination;
pub mod retry;
pub mod streaming;

#[cfg(feature = "blocking")]
#[cfg_attr(docsrs, doc(cfg(feature = "blocking")))]
pub mod blocking;


// Re-export key dependencies for convenience
pub use ron_app_sdk_core as sdk_core;
pub use serde_json::Value as JsonValue;
pub use tokio_util::sync::CancellationToken;

/// A JSON object as returned by every call.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("ron-app-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ClientConfig, Error, Event, FacetClient, HttpMethod, JsonObject, Query, Request, Result,
        RonClient, SubscribeOptions,
    };
    pub use futures::StreamExt;
}
