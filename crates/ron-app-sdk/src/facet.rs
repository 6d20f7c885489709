//! Facet-scoped client
//!
//! Application facets live under `/app/{facet}` on the gateway.
//! [`FacetClient`] keeps that prefix out of call sites.

use std::future::Future;

use serde_json::Value;

use crate::{
    JsonObject,
    client::RonClient,
    error::Result,
    http::{Query, Request},
    pagination::Paginator,
    streaming::{Event, EventStream, SubscribeOptions},
};

/// A [`RonClient`] bound to one facet.
///
/// ```rust,no_run
/// # use ron_app_sdk::{FacetClient, RonClient};
/// # async fn example(client: RonClient) -> ron_app_sdk::Result<()> {
/// let users = FacetClient::new(client, "users");
/// let me = users.get("/me").await?; // GET /app/users/me
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FacetClient {
    client: RonClient,
    facet: String,
}

impl FacetClient {
    /// Bind `client` to `facet`. Leading slashes on the id are ignored.
    pub fn new(client: RonClient, facet: impl AsRef<str>) -> Self {
        Self {
            client,
            facet: facet.as_ref().trim_start_matches('/').to_string(),
        }
    }

    /// Facet id without leading slash.
    pub fn facet(&self) -> &str {
        &self.facet
    }

    /// The underlying client.
    pub fn client(&self) -> &RonClient {
        &self.client
    }

    /// Full gateway path for `path` within this facet.
    pub fn path(&self, path: &str) -> String {
        match path {
            "" => format!("/app/{}", self.facet),
            p if p.starts_with('/') => format!("/app/{}{p}", self.facet),
            p => format!("/app/{}/{p}", self.facet),
        }
    }

    /// Execute `request` with its path scoped to this facet.
    pub async fn call(&self, request: Request) -> Result<JsonObject> {
        let request = request.map_path(|p| self.path(p));
        self.client.call(request).await
    }

    /// GET within the facet.
    pub async fn get(&self, path: &str) -> Result<JsonObject> {
        self.client.get(&self.path(path)).await
    }

    /// GET within the facet with query parameters.
    pub async fn get_with_query(&self, path: &str, query: Query) -> Result<JsonObject> {
        self.client.get_with_query(&self.path(path), query).await
    }

    /// POST within the facet.
    pub async fn post(&self, path: &str, body: impl Into<Value>) -> Result<JsonObject> {
        self.client.post(&self.path(path), body).await
    }

    /// PUT within the facet.
    pub async fn put(&self, path: &str, body: impl Into<Value>) -> Result<JsonObject> {
        self.client.put(&self.path(path), body).await
    }

    /// DELETE within the facet.
    pub async fn delete(&self, path: &str) -> Result<JsonObject> {
        self.client.delete(&self.path(path)).await
    }

    /// DELETE within the facet with query parameters.
    pub async fn delete_with_query(&self, path: &str, query: Query) -> Result<JsonObject> {
        self.client.delete_with_query(&self.path(path), query).await
    }

    /// Open an event stream within the facet.
    pub async fn stream_events(
        &self,
        path: &str,
        last_event_id: Option<&str>,
    ) -> Result<EventStream> {
        self.client
            .stream_events(&self.path(path), last_event_id)
            .await
    }

    /// Subscribe to an event stream within the facet.
    pub async fn subscribe<F, Fut>(
        &self,
        path: &str,
        callback: F,
        options: SubscribeOptions,
    ) -> Result<()>
    where
        F: FnMut(Event) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.client
            .subscribe(&self.path(path), callback, options)
            .await
    }

    /// Paginate a collection within the facet.
    pub fn paginate(&self, path: &str, page_size: u32, query: Query) -> Paginator {
        self.client.paginate(&self.path(path), page_size, query)
    }
}
