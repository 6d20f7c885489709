#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Shared building blocks for the RON application SDK.
//!
//! This crate holds the pieces of the SDK that do not touch the network:
//!
//! - **Backoff policies** via the [`BackoffStrategy`](retry::BackoffStrategy) trait
//!   - additive jitter for request retries
//!   - proportional jitter for stream reconnects
//! - **Wire codecs** for the formats the service uses on the wire
//!   (numeric strings, padding-free base64url, UTC timestamps)
//!
//! # Examples
//!
//! ```rust
//! use ron_app_sdk_core::prelude::*;
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(200))
//!     .jitter(Jitter::Additive(Duration::from_millis(200)))
//!     .build();
//!
//! let first = backoff.next_delay(0).unwrap();
//! assert!(first >= Duration::from_millis(200));
//! assert!(first < Duration::from_millis(400));
//! ```

pub mod codec;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use ron_app_sdk_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::codec::{
        CodecError, b64url_decode, b64url_encode, decode_u64, encode_i64, encode_u64,
        format_timestamp, parse_timestamp,
    };
    pub use crate::retry::{BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder, Jitter};
}
