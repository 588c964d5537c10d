// Ports define what applications need from an event store, without implementing it.
//
// Purpose
// - Describe the store's operation surface as a trait so application code can
//   swap this in-memory store for a durable one.
//
// Boundaries
// - No concrete storage here. The in-memory engine implements this trait in
//   the store module.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::event::{EventData, RecordedEvent};
use crate::core::snapshot::Snapshot;
use crate::core::subscription::{StartFrom, SubscriberHandle};
use crate::reader::ForwardReader;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("wrong expected version: expected {expected}, actual {actual}")]
    WrongExpectedVersion { expected: u64, actual: u64 },

    #[error("stream not found: {stream_id}")]
    StreamNotFound { stream_id: String },

    #[error("subscription already exists: {name}")]
    SubscriptionAlreadyExists { name: String },

    #[error("snapshot not found: {source_uuid}")]
    SnapshotNotFound { source_uuid: Uuid },

    #[error("store engine unavailable")]
    EngineUnavailable,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a batch to a stream, checking `expected_version` against the
    /// current stream length. Returns the new stream length. All-or-nothing:
    /// on `WrongExpectedVersion` no state changes and no global event numbers
    /// are consumed.
    async fn append_to_stream(
        &self,
        stream_id: &str,
        expected_version: u64,
        events: Vec<EventData>,
    ) -> Result<u64, StoreError>;

    /// Open a lazy forward read over one stream, beginning at the first event
    /// with `stream_version >= max(start_version, 1)`. `batch_size` is a
    /// paging hint only. Fails with `StreamNotFound` if the stream has never
    /// been appended to.
    async fn read_stream_forward(
        &self,
        stream_id: &str,
        start_version: u64,
        batch_size: usize,
    ) -> Result<ForwardReader, StoreError>;

    /// Register (or reattach) the named all-streams subscription. A new
    /// subscription with `StartFrom::Origin` receives the full history before
    /// any live batch; reattachment resumes from the subscription's own
    /// cursor instead. Fails with `SubscriptionAlreadyExists` while a live
    /// subscriber is attached under the same name.
    async fn subscribe_to_all_streams(
        &self,
        name: &str,
        subscriber: SubscriberHandle,
        start_from: StartFrom,
    ) -> Result<SubscriberHandle, StoreError>;

    /// Advance the cursor of whichever attached subscription holds this exact
    /// handle. Fire-and-forget; the cursor is set to the acked event's number
    /// as-is, since subscribers ack in delivery order.
    fn ack_event(&self, subscriber: &SubscriberHandle, event: &RecordedEvent);

    /// Remove the named subscription entirely. Idempotent.
    async fn unsubscribe_from_all_streams(&self, name: &str) -> Result<(), StoreError>;

    /// Liveness notification from the transport: the subscriber behind this
    /// handle is gone. Every subscription attached to it becomes detached,
    /// keeping its name and cursor. Fire-and-forget.
    fn detach_subscriber(&self, subscriber: &SubscriberHandle);

    async fn read_snapshot(&self, source_uuid: Uuid) -> Result<Snapshot, StoreError>;

    /// Upsert by `source_uuid`.
    async fn record_snapshot(&self, snapshot: Snapshot) -> Result<(), StoreError>;

    /// Idempotent delete.
    async fn delete_snapshot(&self, source_uuid: Uuid) -> Result<(), StoreError>;
}
