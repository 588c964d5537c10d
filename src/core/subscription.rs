// Subscription state and the transport facing subscriber channel.
//
// Purpose
// - Model a named all-streams subscription whose identity and replay cursor
//   outlive any one connected subscriber.
//
// Responsibilities
// - SubscriberHandle is the engine's capability to push batches: a channel
//   sender plus an identity. The inbox half stays with the transport.
// - Subscription tracks attachment as a tagged variant, never a nullable field.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::event::EventBatch;

/// Where a brand-new subscription begins. Reattachment ignores this and
/// resumes from the subscription's own cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFrom {
    /// Replay the full history before any live batch.
    Origin,
    /// Deliver only batches persisted after the subscribe call.
    Current,
}

/// Capability to push event batches to one connected subscriber.
///
/// Cloning shares the same identity: equality is identity equality, so the
/// engine can tell "the same subscriber" from "a new subscriber under the
/// same name".
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: Uuid,
    sender: mpsc::UnboundedSender<EventBatch>,
}

impl SubscriberHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Push a batch to the subscriber. Never blocks. Returns false when the
    /// inbox has been dropped, which the engine treats as a disconnect.
    pub(crate) fn push(&self, batch: EventBatch) -> bool {
        self.sender.send(batch).is_ok()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for SubscriberHandle {}

/// Receiving half of a subscriber channel. Owned by the transport, never by
/// the engine. Dropping it is how a subscriber "crashes".
#[derive(Debug)]
pub struct SubscriberInbox {
    receiver: mpsc::UnboundedReceiver<EventBatch>,
}

impl SubscriberInbox {
    /// Wait for the next delivered batch. Returns None once the handle side
    /// is gone and the inbox is drained.
    pub async fn recv(&mut self) -> Option<EventBatch> {
        self.receiver.recv().await
    }

    /// Take an already delivered batch without waiting.
    pub fn try_recv(&mut self) -> Option<EventBatch> {
        self.receiver.try_recv().ok()
    }
}

/// Create a connected handle/inbox pair. The handle goes to
/// `subscribe_to_all_streams`; the inbox stays with the caller.
pub fn subscriber_channel() -> (SubscriberHandle, SubscriberInbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        SubscriberHandle {
            id: Uuid::now_v7(),
            sender,
        },
        SubscriberInbox { receiver },
    )
}

#[derive(Debug, Clone)]
pub enum Attachment {
    Attached(SubscriberHandle),
    Detached,
}

/// Registry entry for one named subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub name: String,
    pub start_from: StartFrom,
    /// Global event_number cursor: everything at or below it has been acked.
    pub last_seen_event_number: u64,
    pub attachment: Attachment,
}

impl Subscription {
    pub fn new(
        name: impl Into<String>,
        start_from: StartFrom,
        last_seen_event_number: u64,
        subscriber: SubscriberHandle,
    ) -> Self {
        Self {
            name: name.into(),
            start_from,
            last_seen_event_number,
            attachment: Attachment::Attached(subscriber),
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.attachment, Attachment::Attached(_))
    }

    pub fn attached_handle(&self) -> Option<&SubscriberHandle> {
        match &self.attachment {
            Attachment::Attached(handle) => Some(handle),
            Attachment::Detached => None,
        }
    }

    /// Drop the live handle but keep name, start_from and cursor.
    pub fn detach(&mut self) {
        self.attachment = Attachment::Detached;
    }
}
