//! Cursor pagination
//!
//! The service pages with an opaque `next_cursor`. Each request carries the
//! caller's query plus both `limit` and `page_size` (servers read one or the
//! other) and, after the first page, `cursor`. Iteration stops after the
//! first page whose cursor is missing or falsy.

use crate::JsonObject;
use crate::client::RonClient;
use crate::error::{Error, Result};
use crate::http::executor::into_object;
use crate::http::{Query, Request};
use futures::Stream;
use serde_json::Value;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Normalized `items`; non-object entries appear as `{"value": entry}`
    pub items: Vec<JsonObject>,
    /// Cursor for the following page, `None` on the last page
    pub next_cursor: Option<String>,
    /// The response object as received
    pub raw: JsonObject,
}

impl Page {
    /// Build a page from a response object.
    pub fn from_response(raw: JsonObject) -> Self {
        let items = match raw.get("items") {
            Some(Value::Array(entries)) => entries.iter().cloned().map(into_object).collect(),
            _ => Vec::new(),
        };
        let next_cursor = raw.get("next_cursor").and_then(cursor_string);
        Self {
            items,
            next_cursor,
            raw,
        }
    }
}

/// String form of a cursor value; `None` for falsy values.
fn cursor_string(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// Lazy, single-pass walk over the pages of one collection.
#[derive(Debug)]
pub struct Paginator {
    client: RonClient,
    path: String,
    page_size: u32,
    query: Query,
    cursor: Option<String>,
    done: bool,
}

impl Paginator {
    /// Create a paginator; no request is made until the first page is asked for.
    pub fn new(client: RonClient, path: impl Into<String>, page_size: u32, query: Query) -> Self {
        Self {
            client,
            path: path.into(),
            page_size,
            query,
            cursor: None,
            done: false,
        }
    }

    /// Fetch the next page, `Ok(None)` once exhausted.
    ///
    /// After an error the paginator can be asked again; it retries the same
    /// cursor.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.done {
            return Ok(None);
        }

        let mut query = self.query.clone();
        query
            .set_default("limit", self.page_size)
            .set_default("page_size", self.page_size);
        if let Some(cursor) = &self.cursor {
            query.set("cursor", cursor.clone());
        }

        let raw = self
            .client
            .call(Request::get(self.path.clone()).with_query(query))
            .await?;
        let page = Page::from_response(raw);

        match &page.next_cursor {
            Some(cursor) => self.cursor = Some(cursor.clone()),
            None => self.done = true,
        }
        Ok(Some(page))
    }

    /// Cursor the next request will send.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Whether the last page has been returned.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Turn the paginator into a stream of pages. The stream ends after the
    /// first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> {
        futures::stream::try_unfold(self, |mut paginator| async move {
            let page = paginator.next_page().await?;
            Ok::<_, Error>(page.map(|page| (page, paginator)))
        })
    }

    /// Collect every item of every page.
    pub async fn collect_items(mut self) -> Result<Vec<JsonObject>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page.items);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixtures are objects"),
        }
    }

    #[test]
    fn test_items_are_normalized() {
        let page = Page::from_response(object(json!({
            "items": [{"id": 1}, 2, "three", null],
            "next_cursor": "abc"
        })));

        assert_eq!(
            page.items,
            vec![
                object(json!({"id": 1})),
                object(json!({"value": 2})),
                object(json!({"value": "three"})),
                object(json!({"value": null})),
            ]
        );
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"items": null}))]
    #[case(json!({"items": {"id": 1}}))]
    #[case(json!({"items": "nope"}))]
    fn test_missing_or_non_list_items_are_empty(#[case] body: Value) {
        assert!(Page::from_response(object(body)).items.is_empty());
    }

    #[rstest]
    #[case(json!(null), None)]
    #[case(json!(false), None)]
    #[case(json!(""), None)]
    #[case(json!(0), None)]
    #[case(json!([]), None)]
    #[case(json!("c2"), Some("c2"))]
    #[case(json!(17), Some("17"))]
    #[case(json!(true), Some("true"))]
    fn test_cursor_coercion(#[case] cursor: Value, #[case] expected: Option<&str>) {
        let page = Page::from_response(object(json!({"items": [], "next_cursor": cursor})));
        assert_eq!(page.next_cursor.as_deref(), expected);
    }
}
