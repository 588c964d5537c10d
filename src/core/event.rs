// Event envelope supplied by callers, and the record assigned by the engine.
//
// Purpose
// - Carry opaque domain payloads through the store without inspecting them.
//
// Responsibilities
// - EventData holds only what the caller provides.
// - RecordedEvent adds the store assigned positions and timestamp; it is
//   immutable once created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventData {
    pub correlation_id: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
}

impl EventData {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            correlation_id: Uuid::now_v7(),
            event_type: event_type.into(),
            data,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Global position across the whole store, starting at 1.
    pub event_number: u64,
    pub stream_id: String,
    /// Position within the stream, starting at 1.
    pub stream_version: u64,
    pub correlation_id: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The events persisted by one append call. Persisted and published together.
pub type EventBatch = Vec<RecordedEvent>;
