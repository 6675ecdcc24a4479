//! In-memory status shown on the panel.

use tokio::time::Instant;

pub const DEFAULT_TITLE: &str = "System Status";
pub const DEFAULT_STATUS: &str = "UNKNOWN";
pub const DEFAULT_DETAIL: &str = "Waiting for data";

/// One `label: value` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

/// Bounded, ordered metric lines
///
/// Capacity is fixed at construction; pushes beyond it are refused so a
/// payload can never grow the model past what the panel can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    items: Vec<Metric>,
    capacity: usize,
}

impl Metrics {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, returning false when the buffer is full
    pub fn try_push(&mut self, label: impl Into<String>, value: impl Into<String>) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(Metric {
            label: label.into(),
            value: value.into(),
        });
        true
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.items.iter()
    }
}

/// Fallback values used when a payload omits a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDefaults {
    /// Subtitle shown until a payload names one
    pub subtitle: String,
    pub metrics_capacity: usize,
}

/// Everything the panel needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct StatusModel {
    pub title: String,
    pub subtitle: String,
    pub status: String,
    pub detail: String,
    /// Timestamp label from the payload, empty when unknown
    pub updated_at: String,
    pub metrics: Metrics,
    /// Distinguishes "never decoded a payload" from "showing one"
    pub has_payload: bool,
    /// When the last message arrived, decoded or not
    pub last_message_at: Option<Instant>,
}

impl StatusModel {
    /// Model shown before any message arrives
    pub fn placeholder(defaults: &StatusDefaults) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            subtitle: defaults.subtitle.clone(),
            status: DEFAULT_STATUS.to_string(),
            detail: DEFAULT_DETAIL.to_string(),
            updated_at: String::new(),
            metrics: Metrics::with_capacity(defaults.metrics_capacity),
            has_payload: false,
            last_message_at: None,
        }
    }

    /// Surface a rejected message on screen instead of keeping stale data silently
    pub fn mark_decode_failure(&mut self, reason: &str, at: Instant) {
        self.detail = format!("JSON error: {}", reason);
        self.has_payload = false;
        self.last_message_at = Some(at);
    }
}
