//! Configuration for the RON client

use crate::DEFAULT_BASE_URL;
use crate::error::{Error, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default cap on a buffered response body (16 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the RON client.
///
/// Every field has a usable default so `ClientConfig::default()` talks to a
/// gateway on the loopback interface. Plain `http` is refused unless
/// `allow_insecure_http` is set, which the default URL therefore requires.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway base URL; request paths are appended to it
    pub base_url: String,

    /// Verify the server certificate chain
    pub verify_tls: bool,

    /// Extra PEM root certificate(s) to trust
    pub tls_ca_path: Option<PathBuf>,

    /// Deadline for one unary attempt, end to end
    pub overall_timeout: Duration,

    /// Deadline for establishing a connection
    pub connect_timeout: Duration,

    /// Maximum idle time between body reads
    pub read_timeout: Duration,

    /// Deadline for sending the request; enforced through the overall deadline
    pub write_timeout: Duration,

    /// Retries after the first attempt for idempotent calls
    pub max_retries: u32,

    /// Simultaneous in-flight attempts; `None` or zero means unbounded
    pub max_concurrency: Option<usize>,

    /// Permit `http://` base URLs
    pub allow_insecure_http: bool,

    /// Largest accepted response body; `None` disables the check
    pub max_response_bytes: Option<usize>,

    /// Static bearer token
    pub token: Option<SecretString>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            verify_tls: true,
            tls_ca_path: None,
            overall_timeout: Duration::from_millis(10_000),
            connect_timeout: Duration::from_millis(3_000),
            read_timeout: Duration::from_millis(7_000),
            write_timeout: Duration::from_millis(5_000),
            max_retries: 3,
            max_concurrency: None,
            allow_insecure_http: false,
            max_response_bytes: Some(DEFAULT_MAX_RESPONSE_BYTES),
            token: None,
        }
    }
}

impl ClientConfig {
    /// Create a builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `RON_SDK_GATEWAY_ADDR`, then `RON_APP_URL`, for the base URL
    /// - `RON_SDK_OVERALL_TIMEOUT_MS`, `RON_SDK_CONNECT_TIMEOUT_MS`,
    ///   `RON_SDK_READ_TIMEOUT_MS`, `RON_SDK_WRITE_TIMEOUT_MS`
    /// - `RON_SDK_MAX_RETRIES`, `RON_SDK_MAX_CONCURRENCY`
    /// - `RON_SDK_ALLOW_INSECURE_HTTP` (`1`/`true`/`yes`/`on` or the negations)
    /// - `RON_SDK_MAX_RESPONSE_BYTES` (`0` disables the cap)
    /// - `RON_APP_TOKEN` for the static bearer token
    ///
    /// Unset or empty variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = env_var("RON_SDK_GATEWAY_ADDR").or_else(|| env_var("RON_APP_URL")) {
            config.base_url = url;
        }

        if let Some(ms) = env_parse::<u64>("RON_SDK_OVERALL_TIMEOUT_MS")? {
            config.overall_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("RON_SDK_CONNECT_TIMEOUT_MS")? {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("RON_SDK_READ_TIMEOUT_MS")? {
            config.read_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("RON_SDK_WRITE_TIMEOUT_MS")? {
            config.write_timeout = Duration::from_millis(ms);
        }

        if let Some(retries) = env_parse::<u32>("RON_SDK_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(limit) = env_parse::<i64>("RON_SDK_MAX_CONCURRENCY")? {
            config.max_concurrency = usize::try_from(limit).ok().filter(|n| *n > 0);
        }
        if let Some(raw) = env_var("RON_SDK_ALLOW_INSECURE_HTTP") {
            config.allow_insecure_http = parse_flag("RON_SDK_ALLOW_INSECURE_HTTP", &raw)?;
        }
        if let Some(bytes) = env_parse::<usize>("RON_SDK_MAX_RESPONSE_BYTES")? {
            config.max_response_bytes = (bytes > 0).then_some(bytes);
        }

        if let Some(token) = env_var("RON_APP_TOKEN") {
            config.token = Some(SecretString::from(token));
        }

        Ok(config)
    }

    /// Load a `.env` file from the working directory (if any), then read the
    /// environment as [`from_env`](Self::from_env) does.
    #[cfg(feature = "env")]
    pub fn from_dotenv() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::config(format!("failed to load .env file: {e}"))),
        }
        Self::from_env()
    }

    /// Check the configuration and return the parsed base URL.
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("invalid base URL {:?}: {e}", self.base_url)))?;

        match url.scheme() {
            "https" => {}
            "http" if self.allow_insecure_http => {}
            "http" => {
                return Err(Error::config(format!(
                    "refusing insecure base URL {}; set allow_insecure_http to permit plain http",
                    self.base_url
                )));
            }
            other => {
                return Err(Error::config(format!(
                    "unsupported base URL scheme {other:?}"
                )));
            }
        }

        for (name, value) in [
            ("overall_timeout", self.overall_timeout),
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }

        Ok(url)
    }

    /// Concurrency bound with zero folded into "unbounded".
    pub fn effective_concurrency(&self) -> Option<usize> {
        self.max_concurrency.filter(|n| *n > 0)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::config(format!("{name}={raw:?} is invalid: {e}")))
        })
        .transpose()
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{name}={raw:?} is not a boolean"))),
    }
}

/// Builder for creating ClientConfig with a fluent API.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the static bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(SecretString::from(token.into()));
        self
    }

    /// Toggle certificate verification.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.verify_tls = verify;
        self
    }

    /// Trust the PEM certificate(s) at `path`.
    pub fn tls_ca_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls_ca_path = Some(path.into());
        self
    }

    /// Set the overall per-attempt deadline.
    pub fn overall_timeout(mut self, timeout: Duration) -> Self {
        self.config.overall_timeout = timeout;
        self
    }

    /// Set the connect deadline.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read idle deadline.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the write deadline.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set the retry budget for idempotent calls.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Bound simultaneous in-flight attempts.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.config.max_concurrency = Some(limit);
        self
    }

    /// Permit plain `http://` base URLs.
    pub fn allow_insecure_http(mut self, allow: bool) -> Self {
        self.config.allow_insecure_http = allow;
        self
    }

    /// Set (or with `None`, remove) the response size cap.
    pub fn max_response_bytes(mut self, limit: Option<usize>) -> Self {
        self.config.max_response_bytes = limit;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.overall_timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_response_bytes, Some(16 * 1024 * 1024));
        assert!(config.verify_tls);
        assert!(!config.allow_insecure_http);
    }

    #[test]
    fn test_default_url_requires_insecure_override() {
        assert_matches!(ClientConfig::default().validate(), Err(Error::Config(_)));

        let config = ClientConfig::builder().allow_insecure_http(true).build();
        assert_eq!(config.validate().unwrap().port(), Some(8080));
    }

    #[test]
    fn test_rejects_bad_urls_and_zero_timeouts() {
        let bad_scheme = ClientConfig::builder().base_url("ftp://gateway").build();
        assert_matches!(bad_scheme.validate(), Err(Error::Config(_)));

        let garbage = ClientConfig::builder().base_url("not a url").build();
        assert_matches!(garbage.validate(), Err(Error::Config(_)));

        let zero = ClientConfig::builder()
            .base_url("https://gateway")
            .read_timeout(Duration::ZERO)
            .build();
        assert_matches!(zero.validate(), Err(Error::Config(msg)) if msg.contains("read_timeout"));
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .base_url("https://gateway.example")
            .token("tok")
            .max_retries(0)
            .max_concurrency(4)
            .max_response_bytes(None)
            .build();

        assert_eq!(config.base_url, "https://gateway.example");
        assert_eq!(config.token.as_ref().unwrap().expose_secret(), "tok");
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.effective_concurrency(), Some(4));
        assert_eq!(config.max_response_bytes, None);
    }

    #[test]
    fn test_zero_concurrency_is_unbounded() {
        let config = ClientConfig::builder().max_concurrency(0).build();
        assert_eq!(config.effective_concurrency(), None);
    }

    #[test]
    fn test_config_from_env_variables() {
        temp_env::with_vars(
            [
                ("RON_SDK_GATEWAY_ADDR", Some("https://gw.example")),
                ("RON_APP_URL", Some("https://ignored.example")),
                ("RON_SDK_OVERALL_TIMEOUT_MS", Some("2500")),
                ("RON_SDK_CONNECT_TIMEOUT_MS", Some("100")),
                ("RON_SDK_MAX_RETRIES", Some("5")),
                ("RON_SDK_MAX_CONCURRENCY", Some("-1")),
                ("RON_SDK_ALLOW_INSECURE_HTTP", Some("yes")),
                ("RON_SDK_MAX_RESPONSE_BYTES", Some("0")),
                ("RON_APP_TOKEN", Some("env-token")),
            ],
            || {
                let config = ClientConfig::from_env().expect("env config should load");
                assert_eq!(config.base_url, "https://gw.example");
                assert_eq!(config.overall_timeout, Duration::from_millis(2500));
                assert_eq!(config.connect_timeout, Duration::from_millis(100));
                assert_eq!(config.read_timeout, Duration::from_millis(7000));
                assert_eq!(config.max_retries, 5);
                assert_eq!(config.max_concurrency, None);
                assert!(config.allow_insecure_http);
                assert_eq!(config.max_response_bytes, None);
                assert_eq!(config.token.unwrap().expose_secret(), "env-token");
            },
        );
    }

    #[test]
    fn test_config_from_env_fallback_url() {
        temp_env::with_vars(
            [
                ("RON_SDK_GATEWAY_ADDR", None),
                ("RON_APP_URL", Some("https://app.example")),
            ],
            || {
                let config = ClientConfig::from_env().unwrap();
                assert_eq!(config.base_url, "https://app.example");
            },
        );
    }

    #[test]
    fn test_config_from_env_rejects_garbage() {
        temp_env::with_var("RON_SDK_READ_TIMEOUT_MS", Some("soon"), || {
            assert_matches!(
                ClientConfig::from_env(),
                Err(Error::Config(msg)) if msg.contains("RON_SDK_READ_TIMEOUT_MS")
            );
        });
        temp_env::with_var("RON_SDK_ALLOW_INSECURE_HTTP", Some("maybe"), || {
            assert!(ClientConfig::from_env().is_err());
        });
    }
}
