// Requests carried by the engine mailbox.
//
// Purpose
// - One variant per store operation. Synchronous operations carry a oneshot
//   reply sender; acks and liveness notifications are reply-less but still
//   pass through the same mailbox, so every operation is totally ordered.

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::core::event::{EventData, RecordedEvent};
use crate::core::ports::StoreError;
use crate::core::snapshot::Snapshot;
use crate::core::subscription::{StartFrom, SubscriberHandle};

pub(crate) enum Request {
    Append {
        stream_id: String,
        expected_version: u64,
        events: Vec<EventData>,
        reply: oneshot::Sender<Result<u64, StoreError>>,
    },
    ReadForward {
        stream_id: String,
        start_version: u64,
        max_count: usize,
        reply: oneshot::Sender<Result<Vec<RecordedEvent>, StoreError>>,
    },
    Subscribe {
        name: String,
        subscriber: SubscriberHandle,
        start_from: StartFrom,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    AckEvent {
        subscriber_id: Uuid,
        event_number: u64,
    },
    Unsubscribe {
        name: String,
        reply: oneshot::Sender<()>,
    },
    DetachSubscriber {
        subscriber_id: Uuid,
    },
    ReadSnapshot {
        source_uuid: Uuid,
        reply: oneshot::Sender<Result<Snapshot, StoreError>>,
    },
    RecordSnapshot {
        snapshot: Snapshot,
        reply: oneshot::Sender<()>,
    },
    DeleteSnapshot {
        source_uuid: Uuid,
        reply: oneshot::Sender<()>,
    },
}
