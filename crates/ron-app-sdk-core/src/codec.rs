//! Wire codecs.
//!
//! The service moves 64-bit integers as decimal strings (JSON numbers lose
//! precision past 2^53), binary blobs as padding-free URL-safe base64, and
//! instants as RFC 3339 strings in UTC.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Errors raised while encoding or decoding wire values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A negative value was offered to an unsigned wire field.
    #[error("negative value {0} cannot be encoded as an unsigned integer")]
    Negative(i64),

    /// The text is not a canonical unsigned decimal.
    #[error("invalid unsigned integer string: {0:?}")]
    InvalidInteger(String),

    /// The text is not valid URL-safe base64.
    #[error("invalid base64url: {0}")]
    InvalidBase64(String),

    /// The text is not an RFC 3339 timestamp.
    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input
        input: String,
        /// Parser diagnostic
        reason: String,
    },
}

/// Encode an unsigned integer as its decimal string.
pub fn encode_u64(value: u64) -> String {
    value.to_string()
}

/// Encode a signed integer, rejecting negatives before anything is produced.
///
/// ```rust
/// use ron_app_sdk_core::codec::{encode_i64, CodecError};
///
/// assert_eq!(encode_i64(42).unwrap(), "42");
/// assert_eq!(encode_i64(-1), Err(CodecError::Negative(-1)));
/// ```
pub fn encode_i64(value: i64) -> Result<String, CodecError> {
    u64::try_from(value)
        .map(encode_u64)
        .map_err(|_| CodecError::Negative(value))
}

/// Decode a decimal string into an unsigned integer.
///
/// Only ASCII digits are accepted: no sign, no whitespace, no empty string.
pub fn decode_u64(text: &str) -> Result<u64, CodecError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidInteger(text.to_string()));
    }
    text.parse::<u64>()
        .map_err(|_| CodecError::InvalidInteger(text.to_string()))
}

/// Encode bytes as URL-safe base64 without padding.
pub fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe base64. Trailing `=` padding is tolerated.
pub fn b64url_decode(text: &str) -> Result<Vec<u8>, CodecError> {
    URL_SAFE_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

/// Format an instant as RFC 3339 in UTC, always ending in `Z`.
///
/// Sub-second precision is kept only when present.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an RFC 3339 timestamp into UTC.
///
/// Offsets are converted to UTC; a timestamp with no offset is read as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, CodecError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| CodecError::InvalidTimestamp {
            input: text.to_string(),
            reason: e.to_string(),
        })
}

/// Serde adapter carrying a `u64` field as a decimal string.
///
/// ```rust
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Quota {
///     #[serde(with = "ron_app_sdk_core::codec::u64_string")]
///     bytes: u64,
/// }
/// ```
pub mod u64_string {
    use serde::{Deserialize, Deserializer, Serializer, de};

    /// Serialize as a decimal string.
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_u64(*value))
    }

    /// Deserialize from a decimal string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::decode_u64(&text).map_err(de::Error::custom)
    }
}
