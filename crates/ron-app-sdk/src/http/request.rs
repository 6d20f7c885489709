//! Request descriptors

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The HTTP methods the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Safe to repeat by HTTP semantics alone.
    pub fn is_idempotent(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Options)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(Error::config(format!("unsupported HTTP method: {other}"))),
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Options => http::Method::OPTIONS,
        }
    }
}

/// A query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Sent verbatim
    Str(String),
    /// Sent in decimal
    Int(i64),
    /// Sent in decimal
    Float(f64),
    /// Sent as `true` / `false`
    Bool(bool),
    /// Not sent at all
    Absent,
}

impl QueryValue {
    /// Wire form, `None` for [`QueryValue::Absent`].
    pub fn encode(&self) -> Option<String> {
        match self {
            QueryValue::Str(s) => Some(s.clone()),
            QueryValue::Int(i) => Some(i.to_string()),
            QueryValue::Float(f) => Some(f.to_string()),
            QueryValue::Bool(b) => Some(b.to_string()),
            QueryValue::Absent => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Absent, Into::into)
    }
}

/// Ordered query parameters. Keys are unique; order of first insertion is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query(Vec<(String, QueryValue)>);

impl Query {
    /// Empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    /// Insert `key` only when it is not present yet.
    pub fn set_default(
        &mut self,
        key: impl Into<String>,
        value: impl Into<QueryValue>,
    ) -> &mut Self {
        let key = key.into();
        if !self.contains(&key) {
            self.0.push((key, value.into()));
        }
        self
    }

    /// Whether `key` is present (absent values included).
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// True when there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key/value pairs to put on the wire, absent values dropped.
    pub fn encode(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.encode().map(|v| (k.clone(), v)))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (k, v) in iter {
            query.set(k, v);
        }
        query
    }
}

/// One logical call: method, path, optional JSON body and query.
///
/// ```rust
/// use ron_app_sdk::http::{HttpMethod, Request};
/// use serde_json::json;
///
/// let request = Request::put("/kv/answer")
///     .json(json!({"value": 42}))
///     .idempotent(true);
///
/// assert_eq!(request.method(), HttpMethod::Put);
/// assert!(request.is_idempotent());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: HttpMethod,
    path: String,
    body: Option<Value>,
    query: Query,
    idempotent: bool,
}

impl Request {
    /// Create a request for `method` and `path`.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Query::new(),
            idempotent: false,
        }
    }

    /// GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add one query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.set(key, value);
        self
    }

    /// Replace the whole query.
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Declare the call safe to repeat even though the method is not.
    ///
    /// Marked calls are retried and carry an `Idempotency-Key` header.
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// Rewrite the path, keeping everything else.
    pub(crate) fn map_path(mut self, f: impl FnOnce(&str) -> String) -> Self {
        self.path = f(&self.path);
        self
    }

    /// HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Query parameters.
    pub fn query_params(&self) -> &Query {
        &self.query
    }

    /// True when the caller explicitly marked the call idempotent.
    pub fn marked_idempotent(&self) -> bool {
        self.idempotent
    }

    /// True when the call may be retried: safe method or explicit mark.
    pub fn is_idempotent(&self) -> bool {
        self.method.is_idempotent() || self.idempotent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(HttpMethod::Get, false, true)]
    #[case(HttpMethod::Head, false, true)]
    #[case(HttpMethod::Options, false, true)]
    #[case(HttpMethod::Post, false, false)]
    #[case(HttpMethod::Put, false, false)]
    #[case(HttpMethod::Delete, true, true)]
    #[case(HttpMethod::Post, true, true)]
    fn test_idempotency(#[case] method: HttpMethod, #[case] marked: bool, #[case] expected: bool) {
        let request = Request::new(method, "/x").idempotent(marked);
        assert_eq!(request.is_idempotent(), expected);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Options".parse::<HttpMethod>().unwrap(), HttpMethod::Options);
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_query_encoding_drops_absent() {
        let query: Query = [
            ("q", QueryValue::from("rust")),
            ("n", QueryValue::from(3)),
            ("exact", QueryValue::from(true)),
            ("cursor", QueryValue::from(None::<String>)),
            ("ratio", QueryValue::from(0.5)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            query.encode(),
            vec![
                ("q".to_string(), "rust".to_string()),
                ("n".to_string(), "3".to_string()),
                ("exact".to_string(), "true".to_string()),
                ("ratio".to_string(), "0.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut query = Query::new();
        query.set("limit", 10);
        query.set_default("limit", 100).set_default("page_size", 100);
        query.set("limit", 20);

        assert_eq!(query.get("limit"), Some(&QueryValue::Int(20)));
        assert_eq!(query.get("page_size"), Some(&QueryValue::Int(100)));
        assert_eq!(query.encode().len(), 2);
    }
}
