//! Server-sent event records

use crate::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One event decoded from a blank-line-delimited SSE block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Resumption token from the block's `id` field
    pub id: Option<String>,
    /// Logical type from the block's `event` field
    pub event: Option<String>,
    /// `data` lines joined with `\n`
    pub data: String,
    /// Reconnect hint in milliseconds from the block's `retry` field
    pub retry: Option<u64>,
}

impl Event {
    /// Data parsed as JSON, or the raw text as a JSON string when it is not JSON.
    pub fn json_data(&self) -> Value {
        serde_json::from_str(&self.data).unwrap_or_else(|_| Value::String(self.data.clone()))
    }

    /// Data as a JSON object; anything else yields an empty object.
    pub fn object_data(&self) -> JsonObject {
        match self.json_data() {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        }
    }

    /// Reconnect hint as a duration.
    pub fn retry_delay(&self) -> Option<Duration> {
        self.retry.map(Duration::from_millis)
    }
}
