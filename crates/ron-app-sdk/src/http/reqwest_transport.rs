//! `reqwest`-backed transport

use super::transport::{
    ByteStream, StreamingResponse, Transport, TransportError, TransportRequest, TransportResponse,
};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Certificate;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Production transport built on pooled `reqwest::Client`s.
///
/// Unary requests get the connect, read-idle and overall deadlines. Event
/// streams use a second client with the connect deadline only, so a quiet
/// but healthy stream is never cut off.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    stream_client: reqwest::Client,
    base_url: Url,
    overall_timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport from a configuration.
    ///
    /// Fails with [`Error::Config`] when the configuration does not validate or
    /// the CA bundle cannot be loaded.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base_url = config.validate()?;
        let roots = match &config.tls_ca_path {
            Some(path) => load_ca_bundle(path)?,
            None => Vec::new(),
        };

        let client = client_builder(config, &roots)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        let stream_client = client_builder(config, &roots)
            .build()
            .map_err(|e| Error::config(format!("failed to build streaming HTTP client: {e}")))?;

        Ok(Self {
            client,
            stream_client,
            base_url,
            overall_timeout: config.overall_timeout,
        })
    }

    /// Join `path` onto the base URL, keeping any base path prefix.
    fn url_for(&self, path: &str) -> std::result::Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined)
            .map_err(|e| TransportError::Network(format!("invalid URL {joined}: {e}")))
    }

    fn build(
        &self,
        client: &reqwest::Client,
        request: TransportRequest,
    ) -> std::result::Result<reqwest::RequestBuilder, TransportError> {
        let url = self.url_for(&request.path)?;
        let mut builder = client
            .request(request.method.into(), url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        Ok(builder)
    }
}

/// Settings shared by the unary and streaming clients.
fn client_builder(config: &ClientConfig, roots: &[Certificate]) -> reqwest::ClientBuilder {
    let mut builder = reqwest::Client::builder()
        .user_agent(crate::USER_AGENT)
        .connect_timeout(config.connect_timeout)
        .danger_accept_invalid_certs(!config.verify_tls);
    for certificate in roots {
        builder = builder.add_root_certificate(certificate.clone());
    }
    builder
}

fn load_ca_bundle(path: &Path) -> Result<Vec<Certificate>> {
    let pem = std::fs::read(path)
        .map_err(|e| Error::config(format!("failed to read CA bundle {}: {e}", path.display())))?;
    let certificates = Certificate::from_pem_bundle(&pem)
        .map_err(|e| Error::config(format!("invalid CA bundle {}: {e}", path.display())))?;
    if certificates.is_empty() {
        return Err(Error::config(format!(
            "CA bundle {} contains no certificates",
            path.display()
        )));
    }
    Ok(certificates)
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let response = self
            .build(&self.client, request)?
            .timeout(self.overall_timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }

    async fn open_stream(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<StreamingResponse, TransportError> {
        let response = self
            .build(&self.stream_client, request)?
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body: ByteStream = Box::pin(response.bytes_stream().map_err(classify));

        Ok(StreamingResponse {
            status,
            headers,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}
