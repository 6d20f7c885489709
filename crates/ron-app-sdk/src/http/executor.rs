//! Single-attempt request execution

use super::Request;
use super::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::JsonObject;
use crate::auth::ResolvedHeaders;
use crate::error::{Error, Result};
use crate::metrics::RequestMetrics;
use crate::observability::{AttemptLog, RequestTimer};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;

/// Performs exactly one exchange and classifies its outcome.
///
/// Checks on a completed response run in a fixed order: size cap, then
/// 401/403, then problem parsing for other statuses of 400 and above, then
/// the success body. Each attempt records one metrics event and logs once.
#[derive(Debug, Clone)]
pub(crate) struct RequestExecutor {
    transport: Arc<dyn Transport>,
    metrics: Arc<RequestMetrics>,
    max_response_bytes: Option<usize>,
}

impl RequestExecutor {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        metrics: Arc<RequestMetrics>,
        max_response_bytes: Option<usize>,
    ) -> Self {
        Self {
            transport,
            metrics,
            max_response_bytes,
        }
    }

    pub(crate) async fn execute(
        &self,
        request: &Request,
        resolved: ResolvedHeaders,
    ) -> Result<JsonObject> {
        let method = request.method();
        let path = request.path();

        let body = match request.body() {
            Some(value) => Some(Bytes::from(serde_json::to_vec(value).map_err(|e| {
                Error::config(format!("failed to encode request body: {e}"))
            })?)),
            None => None,
        };

        let request_id = resolved.request_id.clone();
        let headers = resolved.into_headers();
        let log = AttemptLog {
            method,
            path,
            request_id: &request_id,
            body_size: body.as_ref().map(Bytes::len),
        };
        log.log_sending(&headers);

        let timer = RequestTimer::start();
        let outcome = self
            .transport
            .send(TransportRequest {
                method,
                path: path.to_string(),
                headers,
                body,
                query: request.query_params().encode(),
            })
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                match error {
                    TransportError::Timeout(_) => self.metrics.record_timeout(),
                    TransportError::Network(_) => self.metrics.record_network_error(),
                }
                log.log_failure(timer.elapsed(), &error);
                return Err(error.into_error(method, path));
            }
        };

        let status = response.status.as_u16();
        if let Some(limit) = self.max_response_bytes
            && response.body.len() > limit
        {
            self.metrics.record_network_error();
            let message = format!(
                "response body of {} bytes exceeds limit of {limit} bytes",
                response.body.len()
            );
            log.log_failure(timer.elapsed(), &message);
            return Err(Error::Network {
                message,
                method,
                path: path.to_string(),
                status: Some(status),
            });
        }

        if status >= 400 {
            self.metrics.record_error();
        } else {
            self.metrics.record_success();
        }
        log.log_response(status, timer.elapsed(), response.body.len());

        classify(request, response)
    }
}

/// Turn a completed, size-checked response into the response envelope.
fn classify(request: &Request, response: TransportResponse) -> Result<JsonObject> {
    let status = response.status.as_u16();
    if status >= 400 {
        return Err(Error::from_response(
            request.method(),
            request.path(),
            status,
            &response.body,
        ));
    }

    if status == 204 || response.body.is_empty() {
        return Ok(JsonObject::new());
    }

    let value: Value = serde_json::from_slice(&response.body).map_err(|e| Error::Parse {
        message: e.to_string(),
        method: request.method(),
        path: request.path().to_string(),
        status: Some(status),
    })?;

    Ok(into_object(value))
}

/// Objects pass through; any other JSON value is wrapped as `{"value": ...}`.
pub(crate) fn into_object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = JsonObject::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
