// In memory implementation of the EventStore port.
//
// Purpose
// - Back event-sourced application tests without an external database.
//
// Responsibilities
// - Spawn the engine worker that owns all store state and consumes the
//   mailbox one request at a time.
// - Forward every operation into the mailbox, so concurrent callers are
//   totally ordered and publication happens inside the append step.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use crate::core::event::{EventData, RecordedEvent};
use crate::core::ports::{EventStore, StoreError};
use crate::core::snapshot::Snapshot;
use crate::core::subscription::{StartFrom, SubscriberHandle};
use crate::engine::request::Request;
use crate::engine::state::StoreState;
use crate::reader::ForwardReader;

/// Used when a caller passes a zero batch size to `read_stream_forward`.
pub const DEFAULT_READ_BATCH_SIZE: usize = 128;

/// Client for one in-memory event store instance. Cloning is cheap; every
/// clone feeds the same engine mailbox. The host creates exactly one store
/// per process and the store starts empty.
#[derive(Clone)]
pub struct InMemoryEventStore {
    requests: mpsc::UnboundedSender<Request>,
}

impl InMemoryEventStore {
    /// Create an empty store and spawn its engine worker on the current
    /// tokio runtime. The worker stops once every client clone is dropped.
    pub fn new() -> Self {
        let (requests, mut mailbox) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut state = StoreState::new();
            while let Some(request) = mailbox.recv().await {
                state.handle(request);
            }
            debug!("store mailbox closed, engine stopping");
        });
        Self { requests }
    }

    pub(crate) fn requests(&self) -> mpsc::UnboundedSender<Request> {
        self.requests.clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, StoreError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .map_err(|_| StoreError::EngineUnavailable)?;
        response.await.map_err(|_| StoreError::EngineUnavailable)
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_to_stream(
        &self,
        stream_id: &str,
        expected_version: u64,
        events: Vec<EventData>,
    ) -> Result<u64, StoreError> {
        self.request(|reply| Request::Append {
            stream_id: stream_id.to_string(),
            expected_version,
            events,
            reply,
        })
        .await?
    }

    async fn read_stream_forward(
        &self,
        stream_id: &str,
        start_version: u64,
        batch_size: usize,
    ) -> Result<ForwardReader, StoreError> {
        let batch_size = if batch_size == 0 {
            DEFAULT_READ_BATCH_SIZE
        } else {
            batch_size
        };
        ForwardReader::open(self.requests(), stream_id, start_version, batch_size).await
    }

    async fn subscribe_to_all_streams(
        &self,
        name: &str,
        subscriber: SubscriberHandle,
        start_from: StartFrom,
    ) -> Result<SubscriberHandle, StoreError> {
        let attached = subscriber.clone();
        self.request(|reply| Request::Subscribe {
            name: name.to_string(),
            subscriber,
            start_from,
            reply,
        })
        .await??;
        Ok(attached)
    }

    fn ack_event(&self, subscriber: &SubscriberHandle, event: &RecordedEvent) {
        let _ = self.requests.send(Request::AckEvent {
            subscriber_id: subscriber.id(),
            event_number: event.event_number,
        });
    }

    async fn unsubscribe_from_all_streams(&self, name: &str) -> Result<(), StoreError> {
        self.request(|reply| Request::Unsubscribe {
            name: name.to_string(),
            reply,
        })
        .await
    }

    fn detach_subscriber(&self, subscriber: &SubscriberHandle) {
        let _ = self.requests.send(Request::DetachSubscriber {
            subscriber_id: subscriber.id(),
        });
    }

    async fn read_snapshot(&self, source_uuid: Uuid) -> Result<Snapshot, StoreError> {
        self.request(|reply| Request::ReadSnapshot { source_uuid, reply })
            .await?
    }

    async fn record_snapshot(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        self.request(|reply| Request::RecordSnapshot { snapshot, reply })
            .await
    }

    async fn delete_snapshot(&self, source_uuid: Uuid) -> Result<(), StoreError> {
        self.request(|reply| Request::DeleteSnapshot { source_uuid, reply })
            .await
    }
}
