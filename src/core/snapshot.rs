// Point in time snapshot of an aggregate, keyed by source identity.
//
// Purpose
// - Let applications persist and reload folded state without replaying a stream.
//
// Responsibilities
// - Carry the source identity and an opaque payload. The store records
//   source_version and source_type verbatim; it never checks them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub source_uuid: Uuid,
    pub source_version: u64,
    pub source_type: String,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        source_uuid: Uuid,
        source_version: u64,
        source_type: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            source_uuid,
            source_version,
            source_type: source_type.into(),
            data,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
