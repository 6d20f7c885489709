//! Per-request credentials and correlation headers

use crate::error::{Error, Result};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Correlation id header, fresh on every attempt.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Replay-safety header, sent only for calls the caller marked idempotent.
pub const IDEMPOTENCY_KEY_HEADER: HeaderName = HeaderName::from_static("idempotency-key");

/// Boxed error returned by token sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies a bearer token on demand.
///
/// The source is asked once per attempt and its answer is never cached, so
/// rotating or short-lived capabilities are picked up immediately. A failing
/// source aborts the call with [`Error::Config`].
///
/// Closures returning `Result<String, BoxError>` implement the trait:
///
/// ```rust
/// use ron_app_sdk::auth::{BoxError, TokenSource};
///
/// let source = || -> Result<String, BoxError> { Ok("cap-123".to_string()) };
/// assert!(source.token().is_ok());
/// ```
pub trait TokenSource: Send + Sync {
    /// Produce the token for the next attempt.
    fn token(&self) -> std::result::Result<SecretString, BoxError>;
}

impl<F> TokenSource for F
where
    F: Fn() -> std::result::Result<String, BoxError> + Send + Sync,
{
    fn token(&self) -> std::result::Result<SecretString, BoxError> {
        self().map(SecretString::from)
    }
}

/// Headers resolved for one attempt.
#[derive(Debug)]
pub struct ResolvedHeaders {
    /// Value of `X-Request-Id`
    pub request_id: String,
    /// Value of `Idempotency-Key`, when sent
    pub idempotency_key: Option<String>,
    headers: HeaderMap,
}

impl ResolvedHeaders {
    /// The headers, the `Authorization` value flagged sensitive.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Take the header map.
    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }
}

/// Chooses the bearer token and mints correlation identifiers.
#[derive(Clone, Default)]
pub struct AuthResolver {
    static_token: Option<SecretString>,
    source: Option<Arc<dyn TokenSource>>,
}

impl fmt::Debug for AuthResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResolver")
            .field("static_token", &self.static_token.as_ref().map(|_| "***"))
            .field("source", &self.source.as_ref().map(|_| "dyn TokenSource"))
            .finish()
    }
}

impl AuthResolver {
    /// Create a resolver. A token source, when given, takes precedence.
    pub fn new(static_token: Option<SecretString>, source: Option<Arc<dyn TokenSource>>) -> Self {
        Self {
            static_token,
            source,
        }
    }

    /// Forget every credential.
    pub fn clear(&mut self) {
        self.static_token = None;
        self.source = None;
    }

    /// True when no credential is configured.
    pub fn is_anonymous(&self) -> bool {
        self.static_token.is_none() && self.source.is_none()
    }

    /// Resolve the headers for one attempt.
    ///
    /// `marked_idempotent` is the caller's explicit mark, not the method's
    /// idempotency; only marked calls get an `Idempotency-Key`.
    pub fn resolve(&self, marked_idempotent: bool) -> Result<ResolvedHeaders> {
        let mut headers = HeaderMap::new();

        if let Some(token) = self.current_token()?
            && !token.expose_secret().is_empty()
        {
            let mut value = HeaderValue::try_from(format!("Bearer {}", token.expose_secret()))
                .map_err(|_| Error::config("bearer token contains invalid header characters"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let request_id = Uuid::new_v4().simple().to_string();
        headers.insert(REQUEST_ID_HEADER, header_value(&request_id)?);

        let idempotency_key = if marked_idempotent {
            let key = Uuid::new_v4().to_string();
            headers.insert(IDEMPOTENCY_KEY_HEADER, header_value(&key)?);
            Some(key)
        } else {
            None
        };

        Ok(ResolvedHeaders {
            request_id,
            idempotency_key,
            headers,
        })
    }

    fn current_token(&self) -> Result<Option<SecretString>> {
        match &self.source {
            Some(source) => source
                .token()
                .map(Some)
                .map_err(|e| Error::config(format!("token source failed: {e}"))),
            None => Ok(self.static_token.clone()),
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::config(format!("invalid header value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn source(token: &'static str) -> Arc<dyn TokenSource> {
        Arc::new(move || -> std::result::Result<String, BoxError> { Ok(token.to_string()) })
    }

    #[test]
    fn test_dynamic_source_wins() {
        let resolver = AuthResolver::new(
            Some(SecretString::from("static".to_string())),
            Some(source("dynamic")),
        );
        let resolved = resolver.resolve(false).unwrap();

        let auth = resolved.headers().get(AUTHORIZATION).unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer dynamic");
        assert!(auth.is_sensitive());
    }

    #[test]
    fn test_static_token_used_without_source() {
        let resolver = AuthResolver::new(Some(SecretString::from("static".to_string())), None);
        let resolved = resolver.resolve(false).unwrap();

        assert_eq!(
            resolved.headers().get(AUTHORIZATION).unwrap(),
            "Bearer static"
        );
    }

    #[test]
    fn test_anonymous_and_empty_tokens_send_no_authorization() {
        let anonymous = AuthResolver::default().resolve(false).unwrap();
        assert!(anonymous.headers().get(AUTHORIZATION).is_none());

        let empty = AuthResolver::new(None, Some(source("")));
        assert!(empty.resolve(false).unwrap().headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_failing_source_is_config_error() {
        let failing: Arc<dyn TokenSource> =
            Arc::new(|| -> std::result::Result<String, BoxError> { Err("vault sealed".into()) });
        let resolver =
            AuthResolver::new(Some(SecretString::from("static".to_string())), Some(failing));

        assert_matches!(
            resolver.resolve(false),
            Err(Error::Config(msg)) if msg.contains("vault sealed")
        );
    }

    #[test]
    fn test_fresh_ids_per_attempt() {
        let resolver = AuthResolver::default();
        let first = resolver.resolve(true).unwrap();
        let second = resolver.resolve(true).unwrap();

        assert_eq!(first.request_id.len(), 32);
        assert_ne!(first.request_id, second.request_id);
        assert_ne!(first.idempotency_key, second.idempotency_key);
        assert_eq!(
            first.headers().get(IDEMPOTENCY_KEY_HEADER).unwrap(),
            first.idempotency_key.as_deref().unwrap()
        );
    }

    #[test]
    fn test_idempotency_key_only_when_marked() {
        let resolved = AuthResolver::default().resolve(false).unwrap();
        assert!(resolved.idempotency_key.is_none());
        assert!(resolved.headers().get(IDEMPOTENCY_KEY_HEADER).is_none());
    }

    #[test]
    fn test_debug_hides_token() {
        let resolver = AuthResolver::new(Some(SecretString::from("hunter2".to_string())), None);
        assert!(!format!("{resolver:?}").contains("hunter2"));
    }
}
