//! Status payload decoding.
//!
//! Maps a loosely structured JSON body onto a [`StatusModel`]. Missing or
//! mistyped fields fall back to defaults; only unparseable or oversized
//! bodies are rejected.

use crate::status::{
    DEFAULT_DETAIL, DEFAULT_STATUS, DEFAULT_TITLE, Metrics, StatusDefaults, StatusModel,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::Instant;

/// Payload decode errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload of {len} bytes exceeds {limit} byte limit")]
    Oversized { len: usize, limit: usize },
}

/// Decoder for status payloads
#[derive(Debug, Clone)]
pub struct PayloadDecoder {
    defaults: StatusDefaults,
    max_bytes: usize,
}

impl PayloadDecoder {
    pub fn new(defaults: StatusDefaults, max_bytes: usize) -> Self {
        Self {
            defaults,
            max_bytes,
        }
    }

    /// Model to show before any payload arrives
    pub fn placeholder(&self) -> StatusModel {
        StatusModel::placeholder(&self.defaults)
    }

    /// Decode a message body into a fresh model
    pub fn decode(&self, bytes: &[u8]) -> Result<StatusModel, DecodeError> {
        if bytes.len() > self.max_bytes {
            return Err(DecodeError::Oversized {
                len: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let doc: Value = serde_json::from_slice(bytes)?;
        let empty = Map::new();
        let fields = doc.as_object().unwrap_or(&empty);

        let metrics = match fields.get("metrics") {
            Some(Value::Object(map)) => self.collect_metrics(map),
            _ => Metrics::with_capacity(self.defaults.metrics_capacity),
        };

        Ok(StatusModel {
            title: text(fields, &["title"]).unwrap_or(DEFAULT_TITLE).to_string(),
            subtitle: text(fields, &["subtitle"])
                .unwrap_or(self.defaults.subtitle.as_str())
                .to_string(),
            status: text(fields, &["status"]).unwrap_or(DEFAULT_STATUS).to_string(),
            detail: text(fields, &["detail", "details"])
                .unwrap_or(DEFAULT_DETAIL)
                .to_string(),
            updated_at: text(fields, &["updated_at", "timestamp"])
                .unwrap_or_default()
                .to_string(),
            metrics,
            has_payload: true,
            last_message_at: Some(Instant::now()),
        })
    }

    fn collect_metrics(&self, map: &Map<String, Value>) -> Metrics {
        let mut metrics = Metrics::with_capacity(self.defaults.metrics_capacity);
        for (label, value) in map {
            if !metrics.try_push(label.as_str(), stringify(value)) {
                tracing::debug!(
                    "Dropping metrics beyond capacity {} ({} supplied)",
                    metrics.capacity(),
                    map.len()
                );
                break;
            }
        }
        metrics
    }
}

/// First string value among `keys`; other types count as absent
fn text<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
}

/// Natural text form of a metric value (strings unquoted)
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
