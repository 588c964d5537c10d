// Serialized store state: stream table, global log, subscription registry,
// snapshot table, global counter.
//
// Purpose
// - Own every mutable structure of the store. Only the engine loop touches
//   this, one request at a time, so no locking exists anywhere in here.
//
// Responsibilities
// - Enforce optimistic concurrency on append and assign global numbers.
// - Publish each persisted batch to attached subscriptions in the same step.
// - Replay history to (re)attached subscriptions from their cursor.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::event::{EventBatch, EventData, RecordedEvent};
use crate::core::ports::StoreError;
use crate::core::snapshot::Snapshot;
use crate::core::subscription::{Attachment, StartFrom, SubscriberHandle, Subscription};
use crate::engine::request::Request;

pub(crate) struct StoreState {
    streams: HashMap<String, Vec<RecordedEvent>>,
    /// Every batch ever persisted, in append order. Kept forever; catch-up
    /// replays from here.
    global_log: Vec<EventBatch>,
    subscriptions: HashMap<String, Subscription>,
    snapshots: HashMap<Uuid, Snapshot>,
    /// Next global event_number to assign. Starts at 1.
    next_event_number: u64,
}

impl StoreState {
    pub(crate) fn new() -> Self {
        Self {
            streams: HashMap::new(),
            global_log: Vec::new(),
            subscriptions: HashMap::new(),
            snapshots: HashMap::new(),
            next_event_number: 1,
        }
    }

    pub(crate) fn handle(&mut self, request: Request) {
        match request {
            Request::Append {
                stream_id,
                expected_version,
                events,
                reply,
            } => {
                let _ = reply.send(self.append(&stream_id, expected_version, events));
            }
            Request::ReadForward {
                stream_id,
                start_version,
                max_count,
                reply,
            } => {
                let _ = reply.send(self.read_forward(&stream_id, start_version, max_count));
            }
            Request::Subscribe {
                name,
                subscriber,
                start_from,
                reply,
            } => {
                let _ = reply.send(self.subscribe(&name, subscriber, start_from));
            }
            Request::AckEvent {
                subscriber_id,
                event_number,
            } => self.ack(subscriber_id, event_number),
            Request::Unsubscribe { name, reply } => {
                self.unsubscribe(&name);
                let _ = reply.send(());
            }
            Request::DetachSubscriber { subscriber_id } => self.detach_by_id(subscriber_id),
            Request::ReadSnapshot { source_uuid, reply } => {
                let _ = reply.send(self.read_snapshot(source_uuid));
            }
            Request::RecordSnapshot { snapshot, reply } => {
                self.record_snapshot(snapshot);
                let _ = reply.send(());
            }
            Request::DeleteSnapshot { source_uuid, reply } => {
                self.delete_snapshot(source_uuid);
                let _ = reply.send(());
            }
        }
    }

    pub(crate) fn append(
        &mut self,
        stream_id: &str,
        expected_version: u64,
        events: Vec<EventData>,
    ) -> Result<u64, StoreError> {
        let actual = self.streams.get(stream_id).map(|s| s.len() as u64).unwrap_or(0);
        if expected_version != actual {
            return Err(StoreError::WrongExpectedVersion {
                expected: expected_version,
                actual,
            });
        }
        if events.is_empty() {
            // Trivial success: no numbers consumed, no stream entry created.
            return Ok(actual);
        }

        let created_at = Utc::now();
        let first_event_number = self.next_event_number;
        let mut batch = Vec::with_capacity(events.len());
        for (offset, event) in events.into_iter().enumerate() {
            batch.push(RecordedEvent {
                event_number: first_event_number + offset as u64,
                stream_id: stream_id.to_string(),
                stream_version: actual + 1 + offset as u64,
                correlation_id: event.correlation_id,
                event_type: event.event_type,
                data: event.data,
                metadata: event.metadata,
                created_at,
            });
        }
        self.next_event_number = first_event_number + batch.len() as u64;

        let stream = self.streams.entry(stream_id.to_string()).or_default();
        stream.extend(batch.iter().cloned());
        let new_length = stream.len() as u64;

        debug!(
            stream_id,
            count = batch.len(),
            first_event_number,
            "appended batch"
        );
        self.global_log.push(batch.clone());
        self.publish(batch);
        Ok(new_length)
    }

    /// Push one persisted batch to every attached subscription. Sends never
    /// block; a closed inbox detaches the subscription, cursor intact.
    fn publish(&mut self, batch: EventBatch) {
        let mut disconnected = Vec::new();
        for (name, subscription) in &self.subscriptions {
            if let Attachment::Attached(handle) = &subscription.attachment {
                if !handle.push(batch.clone()) {
                    disconnected.push(name.clone());
                }
            }
        }
        for name in disconnected {
            warn!(subscription = %name, "subscriber inbox closed, detaching");
            if let Some(subscription) = self.subscriptions.get_mut(&name) {
                subscription.detach();
            }
        }
    }

    pub(crate) fn read_forward(
        &self,
        stream_id: &str,
        start_version: u64,
        max_count: usize,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        let stream = self
            .streams
            .get(stream_id)
            .ok_or_else(|| StoreError::StreamNotFound {
                stream_id: stream_id.to_string(),
            })?;
        // start_version is 1-based; 0 and 1 both mean the whole stream.
        let start = (start_version.max(1) - 1) as usize;
        let start = start.min(stream.len());
        let end = start.saturating_add(max_count).min(stream.len());
        Ok(stream[start..end].to_vec())
    }

    pub(crate) fn subscribe(
        &mut self,
        name: &str,
        subscriber: SubscriberHandle,
        start_from: StartFrom,
    ) -> Result<(), StoreError> {
        if let Some(subscription) = self.subscriptions.get_mut(name) {
            // An attached handle whose inbox is gone counts as detached even
            // though no liveness notification arrived yet.
            if let Attachment::Attached(handle) = &subscription.attachment {
                if !handle.is_closed() {
                    return Err(StoreError::SubscriptionAlreadyExists {
                        name: name.to_string(),
                    });
                }
            }
            // Reattach: resume from the subscription's own cursor, not from
            // start_from again.
            subscription.attachment = Attachment::Attached(subscriber);
            let cursor = subscription.last_seen_event_number;
            debug!(subscription = name, cursor, "reattached subscription");
            self.catch_up(name, cursor);
            return Ok(());
        }

        let cursor = match start_from {
            StartFrom::Origin => 0,
            // Start the cursor at the high-water mark so a later reattach
            // does not replay history this subscription never wanted.
            StartFrom::Current => self.next_event_number - 1,
        };
        self.subscriptions.insert(
            name.to_string(),
            Subscription::new(name, start_from, cursor, subscriber),
        );
        debug!(subscription = name, ?start_from, "created subscription");
        if start_from == StartFrom::Origin {
            self.catch_up(name, 0);
        }
        Ok(())
    }

    /// Replay every recorded event with event_number > after to the named
    /// subscription, batch-grouped, oldest first. Runs inside the subscribe
    /// step, so the live tail starts exactly where replay ends.
    fn catch_up(&mut self, name: &str, after: u64) {
        let handle = match self.subscriptions.get(name).and_then(Subscription::attached_handle) {
            Some(handle) => handle.clone(),
            None => return,
        };
        let mut disconnected = false;
        for batch in &self.global_log {
            let replay: EventBatch = batch
                .iter()
                .filter(|event| event.event_number > after)
                .cloned()
                .collect();
            if replay.is_empty() {
                continue;
            }
            if !handle.push(replay) {
                disconnected = true;
                break;
            }
        }
        if disconnected {
            warn!(subscription = %name, "subscriber inbox closed during catch-up, detaching");
            if let Some(subscription) = self.subscriptions.get_mut(name) {
                subscription.detach();
            }
        }
    }

    fn ack(&mut self, subscriber_id: Uuid, event_number: u64) {
        for subscription in self.subscriptions.values_mut() {
            let holds_handle = subscription
                .attached_handle()
                .is_some_and(|handle| handle.id() == subscriber_id);
            if holds_handle {
                subscription.last_seen_event_number = event_number;
            }
        }
    }

    fn detach_by_id(&mut self, subscriber_id: Uuid) {
        for subscription in self.subscriptions.values_mut() {
            let holds_handle = subscription
                .attached_handle()
                .is_some_and(|handle| handle.id() == subscriber_id);
            if holds_handle {
                debug!(subscription = %subscription.name, "transport reported subscriber down, detaching");
                subscription.detach();
            }
        }
    }

    fn unsubscribe(&mut self, name: &str) {
        if self.subscriptions.remove(name).is_some() {
            debug!(subscription = name, "removed subscription");
        }
    }

    fn read_snapshot(&self, source_uuid: Uuid) -> Result<Snapshot, StoreError> {
        self.snapshots
            .get(&source_uuid)
            .cloned()
            .ok_or(StoreError::SnapshotNotFound { source_uuid })
    }

    fn record_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.source_uuid, snapshot);
    }

    fn delete_snapshot(&mut self, source_uuid: Uuid) {
        self.snapshots.remove(&source_uuid);
    }
}
