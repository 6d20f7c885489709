//! Error types for the RON application SDK
//!
//! Every failure surfaces as one [`Error`] variant. Callers branch on
//! [`Error::kind`] instead of matching message text, and every variant that
//! comes out of a request carries the method and path that produced it.

use crate::http::HttpMethod;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Result type alias for operations that can fail with an SDK error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// The service answered with a structured problem document.
    #[error("{method} {path} failed with status {status}: {problem}")]
    Problem {
        /// HTTP status code
        status: u16,
        /// Parsed problem document
        problem: Box<Problem>,
        /// Request method
        method: HttpMethod,
        /// Request path
        path: String,
    },

    /// The service rejected the credentials (401) or the capability (403).
    #[error("{method} {path} was rejected with status {status}")]
    Auth {
        /// 401 or 403
        status: u16,
        /// Request method
        method: HttpMethod,
        /// Request path
        path: String,
    },

    /// Transport failure, oversized response or failed stream handshake.
    #[error("network error on {method} {path}: {message}")]
    Network {
        /// Description of the failure
        message: String,
        /// Request method
        method: HttpMethod,
        /// Request path
        path: String,
        /// HTTP status, when a response was received
        status: Option<u16>,
    },

    /// The attempt did not finish before its deadline.
    #[error("{method} {path} timed out: {message}")]
    Timeout {
        /// Description from the transport
        message: String,
        /// Request method
        method: HttpMethod,
        /// Request path
        path: String,
    },

    /// A body that had to be JSON (or a problem document) did not decode.
    #[error("failed to parse response of {method} {path}: {message}")]
    Parse {
        /// Decoder diagnostic
        message: String,
        /// Request method
        method: HttpMethod,
        /// Request path
        path: String,
        /// HTTP status of the response, when there was one
        status: Option<u16>,
    },

    /// Caller misuse: bad configuration, closed client or failing token source.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Closed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Problem`]
    Problem,
    /// See [`Error::Auth`]
    Auth,
    /// See [`Error::Network`]
    Network,
    /// See [`Error::Timeout`]
    Timeout,
    /// See [`Error::Parse`]
    Parse,
    /// See [`Error::Config`]
    Config,
}

impl Error {
    /// Build the error for a completed response with status 400 or above.
    ///
    /// 401 and 403 become [`Error::Auth`] without looking at the body. Other
    /// statuses must carry a problem document or the result is a parse error.
    pub fn from_response(method: HttpMethod, path: &str, status: u16, body: &[u8]) -> Self {
        if status == 401 || status == 403 {
            return Error::Auth {
                status,
                method,
                path: path.to_string(),
            };
        }

        match serde_json::from_slice::<Problem>(body) {
            Ok(problem) => Error::Problem {
                status,
                problem: Box::new(problem),
                method,
                path: path.to_string(),
            },
            Err(e) => Error::Parse {
                message: format!("error body is not a problem document: {e}"),
                method,
                path: path.to_string(),
                status: Some(status),
            },
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// The failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Problem { .. } => ErrorKind::Problem,
            Error::Auth { .. } => ErrorKind::Auth,
            Error::Network { .. } => ErrorKind::Network,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only timeouts and network failures are; everything else is a
    /// definitive answer that another attempt would not change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Network { .. })
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Problem { status, .. } | Error::Auth { status, .. } => Some(*status),
            Error::Network { status, .. } | Error::Parse { status, .. } => *status,
            Error::Timeout { .. } | Error::Config(_) => None,
        }
    }

    /// The problem document, for [`Error::Problem`].
    pub fn problem(&self) -> Option<&Problem> {
        match self {
            Error::Problem { problem, .. } => Some(problem.as_ref()),
            _ => None,
        }
    }
}

/// Structured failure reported by the service.
///
/// `code`, `kind` and `message` are required; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Machine-readable error code, e.g. `internal_error`
    pub code: String,
    /// Error family, e.g. `internal`
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Server-side correlation id
    #[serde(
        default,
        alias = "correlationId",
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_id: Option<String>,
    /// Whether the server considers the failure transient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    /// Server retry hint in milliseconds
    #[serde(
        default,
        alias = "retryAfterMs",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_after_ms: Option<u64>,
    /// Short machine-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Extra detail fields
    #[serde(default, deserialize_with = "null_as_empty")]
    pub details: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.kind, self.message)?;
        if let Some(id) = &self.correlation_id {
            write!(f, " [correlation id {id}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(401)]
    #[case(403)]
    fn test_auth_statuses_ignore_body(#[case] status: u16) {
        let body = br#"{"code":"x","kind":"y","message":"z"}"#;
        let error = Error::from_response(HttpMethod::Get, "/secret", status, body);

        assert_matches!(error, Error::Auth { status: s, .. } if s == status);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_problem_preserves_details() {
        let body = json!({
            "code": "internal_error",
            "kind": "internal",
            "message": "Boom",
            "correlationId": "abc",
            "details": {"foo": "bar"},
            "unexpected": [1, 2, 3]
        });
        let error = Error::from_response(
            HttpMethod::Post,
            "/things",
            500,
            body.to_string().as_bytes(),
        );

        assert_eq!(error.kind(), ErrorKind::Problem);
        assert_eq!(error.status(), Some(500));
        let problem = error.problem().unwrap();
        assert_eq!(problem.code, "internal_error");
        assert_eq!(problem.correlation_id.as_deref(), Some("abc"));
        assert_eq!(problem.details.get("foo"), Some(&json!("bar")));
    }

    #[test]
    fn test_problem_with_null_details() {
        let body = br#"{"code":"conflict","kind":"conflict","message":"Taken","details":null}"#;
        let error = Error::from_response(HttpMethod::Put, "/names/ada", 409, body);

        let problem = error.problem().unwrap();
        assert_eq!(problem.code, "conflict");
        assert!(problem.details.is_empty());
    }

    #[rstest]
    #[case(b"not json".as_slice())]
    #[case(b"".as_slice())]
    #[case(br#"{"code":"x","message":"missing kind"}"#.as_slice())]
    fn test_non_problem_error_body_is_parse_error(#[case] body: &[u8]) {
        let error = Error::from_response(HttpMethod::Get, "/x", 502, body);

        assert_matches!(error, Error::Parse { status: Some(502), .. });
    }

    #[test]
    fn test_retryable_kinds() {
        let timeout = Error::Timeout {
            message: "deadline".into(),
            method: HttpMethod::Get,
            path: "/".into(),
        };
        let network = Error::Network {
            message: "reset".into(),
            method: HttpMethod::Get,
            path: "/".into(),
            status: None,
        };

        assert!(timeout.is_retryable());
        assert!(network.is_retryable());
        assert!(!Error::config("closed").is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let error = Error::from_response(
            HttpMethod::Delete,
            "/items/7",
            409,
            br#"{"code":"conflict","kind":"state","message":"busy"}"#,
        );

        assert_eq!(
            error.to_string(),
            "DELETE /items/7 failed with status 409: conflict (state): busy"
        );
    }
}
