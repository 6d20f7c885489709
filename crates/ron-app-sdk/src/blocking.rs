//! Blocking client
//!
//! A synchronous facade over [`RonClient`] for code without an async
//! runtime. Each instance owns a current-thread tokio runtime; do not use it
//! from inside another runtime.

use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use crate::{
    JsonObject,
    client::RonClient,
    config::ClientConfig,
    error::{Error, Result},
    http::{Query, Request},
    metrics::MetricsSnapshot,
};

/// Synchronous wrapper around [`RonClient`].
#[derive(Debug)]
pub struct BlockingClient {
    client: RonClient,
    runtime: Runtime,
}

impl BlockingClient {
    /// Create a blocking client from a configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::from_client(RonClient::new(config)?)
    }

    /// Wrap an existing async client.
    pub fn from_client(client: RonClient) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::config(format!("failed to start runtime: {e}")))?;
        Ok(Self { client, runtime })
    }

    /// The wrapped async client.
    pub fn client(&self) -> &RonClient {
        &self.client
    }

    /// See [`RonClient::call`].
    pub fn call(&self, request: Request) -> Result<JsonObject> {
        self.runtime.block_on(self.client.call(request))
    }

    /// See [`RonClient::get`].
    pub fn get(&self, path: &str) -> Result<JsonObject> {
        self.runtime.block_on(self.client.get(path))
    }

    /// See [`RonClient::post`].
    pub fn post(&self, path: &str, body: impl Into<Value>) -> Result<JsonObject> {
        self.runtime.block_on(self.client.post(path, body))
    }

    /// See [`RonClient::put`].
    pub fn put(&self, path: &str, body: impl Into<Value>) -> Result<JsonObject> {
        self.runtime.block_on(self.client.put(path, body))
    }

    /// See [`RonClient::delete`].
    pub fn delete(&self, path: &str) -> Result<JsonObject> {
        self.runtime.block_on(self.client.delete(path))
    }

    /// Fetch every item of a paginated collection.
    pub fn paginate_all(
        &self,
        path: &str,
        page_size: u32,
        query: Query,
    ) -> Result<Vec<JsonObject>> {
        let paginator = self.client.paginate(path, page_size, query);
        self.runtime.block_on(paginator.collect_items())
    }

    /// See [`RonClient::metrics`].
    pub fn metrics(&self) -> MetricsSnapshot {
        self.client.metrics()
    }

    /// See [`RonClient::close`].
    pub fn close(&self) {
        self.client.close();
    }
}
