//! Structured logging for requests and streams
//!
//! Every attempt and every stream goes through this layer so that header
//! redaction happens in exactly one place. Credentials never reach a log
//! field: sensitive header values are replaced before formatting.

use crate::http::HttpMethod;
use http::HeaderMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Replacement for sensitive header values.
pub const REDACTED: &str = "***REDACTED***";

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-ron-cap",
    "x-api-key",
    "cookie",
];

/// Whether a header name carries credentials.
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Lazily formatted, redacted view of a header map.
pub struct RedactedHeaders<'a>(pub &'a HeaderMap);

impl fmt::Display for RedactedHeaders<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.0 {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            if value.is_sensitive() || is_sensitive_header(name.as_str()) {
                write!(f, "{}={REDACTED}", name)?;
            } else {
                write!(f, "{}={}", name, value.to_str().unwrap_or("<binary>"))?;
            }
        }
        Ok(())
    }
}

/// Identity of one attempt, for structured logging.
#[derive(Debug, Clone)]
pub struct AttemptLog<'a> {
    /// HTTP method
    pub method: HttpMethod,
    /// Request path
    pub path: &'a str,
    /// Correlation id sent as `X-Request-Id`
    pub request_id: &'a str,
    /// Request body size in bytes
    pub body_size: Option<usize>,
}

impl AttemptLog<'_> {
    /// Log the attempt being sent.
    pub fn log_sending(&self, headers: &HeaderMap) {
        debug!(
            method = %self.method,
            path = %self.path,
            request_id = %self.request_id,
            body_size = self.body_size,
            headers = %RedactedHeaders(headers),
            "Sending HTTP request"
        );
    }

    /// Log a completed response, whatever its status.
    pub fn log_response(&self, status: u16, elapsed: Duration, body_size: usize) {
        info!(
            method = %self.method,
            path = %self.path,
            request_id = %self.request_id,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            body_size,
            "HTTP response received"
        );
    }

    /// Log an attempt that produced no usable response.
    pub fn log_failure(&self, elapsed: Duration, error: &dyn fmt::Display) {
        warn!(
            method = %self.method,
            path = %self.path,
            request_id = %self.request_id,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            "HTTP request failed"
        );
    }
}

/// Timer for measuring request duration
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Logging context for one event stream connection.
pub struct StreamContext {
    path: String,
    event_count: u64,
    timer: RequestTimer,
}

impl StreamContext {
    /// Start tracking a stream on `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            event_count: 0,
            timer: RequestTimer::start(),
        }
    }

    /// Events seen so far.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Log the handshake.
    pub fn log_opened(&self, status: u16, last_event_id: Option<&str>) {
        debug!(
            path = %self.path,
            status,
            last_event_id,
            "Event stream opened"
        );
    }

    /// Log one parsed event.
    pub fn log_event(&mut self, id: Option<&str>, event_type: Option<&str>) {
        self.event_count += 1;
        debug!(
            path = %self.path,
            event_num = self.event_count,
            id,
            event_type,
            "Stream event received"
        );
    }

    /// Log the end of the body.
    pub fn log_complete(&self) {
        info!(
            path = %self.path,
            event_count = self.event_count,
            elapsed_ms = self.timer.elapsed().as_millis() as u64,
            "Event stream ended"
        );
    }

    /// Log a stream failure.
    pub fn log_error(&self, error: &dyn fmt::Display) {
        warn!(
            path = %self.path,
            event_count = self.event_count,
            elapsed_ms = self.timer.elapsed().as_millis() as u64,
            error = %error,
            "Event stream error"
        );
    }
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG`
/// (default `ron_app_sdk=info`).
///
/// Calling it more than once is harmless.
#[cfg(feature = "trace")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ron_app_sdk=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use rstest::rstest;

    #[rstest]
    #[case("Authorization")]
    #[case("x-ron-cap")]
    #[case("X-API-KEY")]
    #[case("cookie")]
    fn test_sensitive_names(#[case] name: &str) {
        assert!(is_sensitive_header(name));
    }

    #[test]
    fn test_redacted_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        headers.insert("x-ron-cap", HeaderValue::from_static("cap-abc"));
        let mut flagged = HeaderValue::from_static("opaque");
        flagged.set_sensitive(true);
        headers.insert("x-custom-secret", flagged);
        headers.insert("x-request-id", HeaderValue::from_static("abc123"));

        let rendered = RedactedHeaders(&headers).to_string();

        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("cap-abc"));
        assert!(!rendered.contains("opaque"));
        assert!(rendered.contains("x-request-id=abc123"));
        assert_eq!(rendered.matches(REDACTED).count(), 3);
    }

    #[test]
    fn test_stream_context_counts_events() {
        let mut ctx = StreamContext::new("/events");
        ctx.log_event(Some("1"), Some("update"));
        ctx.log_event(None, None);
        assert_eq!(ctx.event_count(), 2);
    }
}
