//! Facet-scoped calls

mod common;

use common::MockTransport;
use pretty_assertions::assert_eq;
use ron_app_sdk::{ClientConfig, FacetClient, Query, Request};
use serde_json::json;

#[tokio::test]
async fn test_facet_prefixes_every_call() {
    let transport = MockTransport::new();
    transport
        .respond(200, "{}")
        .respond(200, "{}")
        .respond(200, "{}")
        .respond(200, r#"{"items":[]}"#);
    let client = transport.client(ClientConfig::builder().base_url("https://gw.example").build());
    let users = FacetClient::new(client, "/users");

    users.get("me").await.unwrap();
    users.post("/", json!({"name": "ada"})).await.unwrap();
    users
        .call(Request::delete("/42").idempotent(true))
        .await
        .unwrap();
    users
        .paginate("/", 10, Query::new())
        .collect_items()
        .await
        .unwrap();

    let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec!["/app/users/me", "/app/users/", "/app/users/42", "/app/users/"]
    );
    assert!(transport.header(2, "idempotency-key").is_some());
}

#[tokio::test]
async fn test_facet_streams() {
    let transport = MockTransport::new();
    transport.stream(200, vec![Ok("data: ping\n\n")]);
    let client = transport.client(ClientConfig::builder().base_url("https://gw.example").build());
    let feed = FacetClient::new(client, "feed");

    let stream = feed.stream_events("/events", Some("9")).await.unwrap();

    assert_eq!(stream.path(), "/app/feed/events");
    assert_eq!(transport.header(0, "last-event-id").as_deref(), Some("9"));
}

#[tokio::test]
async fn test_facet_calls_carry_query() {
    let transport = MockTransport::new();
    transport.respond(200, r#"{"items":[]}"#).respond(200, "{}");
    let client = transport.client(ClientConfig::builder().base_url("https://gw.example").build());
    let orders = FacetClient::new(client, "orders");

    let mut filter = Query::new();
    filter.set("status", "open").set("owner", None::<String>);
    orders.get_with_query("/search", filter).await.unwrap();

    let mut purge = Query::new();
    purge.set("before", "2024-01-01");
    orders.delete_with_query("/", purge).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].path, "/app/orders/search");
    assert_eq!(transport.query(0, "status").as_deref(), Some("open"));
    assert_eq!(transport.query(0, "owner"), None);
    assert_eq!(requests[1].path, "/app/orders/");
    assert_eq!(transport.query(1, "before").as_deref(), Some("2024-01-01"));
}
