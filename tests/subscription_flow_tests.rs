// End to end tests for subscription lifecycle, catch-up and live publication.

mod fixtures;

use fixtures::make_events;
use in_memory_event_store::core::event::RecordedEvent;
use in_memory_event_store::core::ports::{EventStore, StoreError};
use in_memory_event_store::core::subscription::{subscriber_channel, StartFrom, SubscriberInbox};
use in_memory_event_store::store::InMemoryEventStore;
use rstest::{fixture, rstest};

#[fixture]
fn before_each() -> InMemoryEventStore {
    fixtures::init_tracing();
    InMemoryEventStore::new()
}

fn event_numbers(batch: &[RecordedEvent]) -> Vec<u64> {
    batch.iter().map(|e| e.event_number).collect()
}

async fn next_batch(inbox: &mut SubscriberInbox) -> Vec<RecordedEvent> {
    inbox.recv().await.expect("subscriber inbox closed early")
}

#[rstest]
#[tokio::test]
async fn it_should_deliver_live_batches_to_an_origin_subscriber_with_no_history(
    before_each: InMemoryEventStore,
) {
    let store = before_each;
    let (handle, mut inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("all", handle, StartFrom::Origin)
        .await
        .expect("EventStore > subscribe failed");
    // Nothing to replay yet.
    assert_eq!(inbox.try_recv(), None);

    store.append_to_stream("order-1", 0, make_events(2)).await.unwrap();
    let batch = next_batch(&mut inbox).await;
    assert_eq!(event_numbers(&batch), vec![1, 2]);
    assert_eq!(inbox.try_recv(), None);
}

#[rstest]
#[tokio::test]
async fn it_should_replay_history_then_the_live_tail_without_gap_or_duplicate(
    before_each: InMemoryEventStore,
) {
    let store = before_each;
    store.append_to_stream("order-1", 0, make_events(3)).await.unwrap();
    store.append_to_stream("order-2", 0, make_events(2)).await.unwrap();

    let (handle, mut inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("late", handle, StartFrom::Origin)
        .await
        .unwrap();
    store.append_to_stream("order-1", 3, make_events(1)).await.unwrap();

    assert_eq!(event_numbers(&next_batch(&mut inbox).await), vec![1, 2, 3]);
    assert_eq!(event_numbers(&next_batch(&mut inbox).await), vec![4, 5]);
    assert_eq!(event_numbers(&next_batch(&mut inbox).await), vec![6]);
    assert_eq!(inbox.try_recv(), None);
}

#[rstest]
#[tokio::test]
async fn it_should_skip_history_for_a_current_subscriber(before_each: InMemoryEventStore) {
    let store = before_each;
    store.append_to_stream("order-1", 0, make_events(3)).await.unwrap();

    let (handle, mut inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("tail", handle, StartFrom::Current)
        .await
        .unwrap();
    assert_eq!(inbox.try_recv(), None);

    store.append_to_stream("order-1", 3, make_events(1)).await.unwrap();
    assert_eq!(event_numbers(&next_batch(&mut inbox).await), vec![4]);
}

#[rstest]
#[tokio::test]
async fn it_should_reject_a_second_subscriber_until_the_first_crashes(
    before_each: InMemoryEventStore,
) {
    let store = before_each;
    let (first, _first_inbox) = subscriber_channel();
    let (second, _second_inbox) = subscriber_channel();

    let attached = store
        .subscribe_to_all_streams("all", first, StartFrom::Current)
        .await
        .expect("EventStore > first subscribe failed");

    let result = store
        .subscribe_to_all_streams("all", second.clone(), StartFrom::Current)
        .await;
    assert!(matches!(
        result,
        Err(StoreError::SubscriptionAlreadyExists { name }) if name == "all"
    ));

    store.detach_subscriber(&attached);
    store
        .subscribe_to_all_streams("all", second, StartFrom::Current)
        .await
        .expect("EventStore > reattach after crash failed");
}

#[rstest]
#[tokio::test]
async fn it_should_resume_from_the_acked_cursor_after_a_reconnect(
    before_each: InMemoryEventStore,
) {
    let store = before_each;
    store.append_to_stream("order-1", 0, make_events(3)).await.unwrap();

    let (first, mut first_inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("all", first.clone(), StartFrom::Origin)
        .await
        .unwrap();
    let history = next_batch(&mut first_inbox).await;
    assert_eq!(event_numbers(&history), vec![1, 2, 3]);

    // Ack the first two events, then the subscriber goes away.
    store.ack_event(&first, &history[0]);
    store.ack_event(&first, &history[1]);
    store.detach_subscriber(&first);

    // Persisted while nobody is attached.
    store.append_to_stream("order-1", 3, make_events(1)).await.unwrap();

    let (second, mut second_inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("all", second, StartFrom::Origin)
        .await
        .unwrap();
    // Unacked suffix of the old batch first, then the missed batch.
    assert_eq!(event_numbers(&next_batch(&mut second_inbox).await), vec![3]);
    assert_eq!(event_numbers(&next_batch(&mut second_inbox).await), vec![4]);
    assert_eq!(second_inbox.try_recv(), None);
    // The detached handle saw nothing after the disconnect.
    assert_eq!(first_inbox.try_recv(), None);
}

#[rstest]
#[tokio::test]
async fn it_should_start_over_after_an_unsubscribe(before_each: InMemoryEventStore) {
    let store = before_each;
    store.append_to_stream("order-1", 0, make_events(2)).await.unwrap();

    let (first, mut first_inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("all", first.clone(), StartFrom::Origin)
        .await
        .unwrap();
    let history = next_batch(&mut first_inbox).await;
    store.ack_event(&first, &history[1]);

    store
        .unsubscribe_from_all_streams("all")
        .await
        .expect("EventStore > unsubscribe failed");
    // Idempotent: a second unsubscribe is not an error.
    store.unsubscribe_from_all_streams("all").await.unwrap();

    let (second, mut second_inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("all", second, StartFrom::Origin)
        .await
        .unwrap();
    assert_eq!(
        event_numbers(&next_batch(&mut second_inbox).await),
        vec![1, 2]
    );
}

#[rstest]
#[tokio::test]
async fn it_should_detach_a_subscription_whose_inbox_was_dropped(
    before_each: InMemoryEventStore,
) {
    let store = before_each;
    let (handle, inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("all", handle, StartFrom::Current)
        .await
        .unwrap();
    drop(inbox);

    // Publication notices the closed inbox and detaches; the name becomes
    // reattachable without an explicit liveness notification.
    store.append_to_stream("order-1", 0, make_events(1)).await.unwrap();

    let (second, mut second_inbox) = subscriber_channel();
    store
        .subscribe_to_all_streams("all", second, StartFrom::Current)
        .await
        .expect("EventStore > reattach after drop failed");
    // The event that failed to deliver was never acked, so it replays first.
    assert_eq!(event_numbers(&next_batch(&mut second_inbox).await), vec![1]);
    store.append_to_stream("order-1", 1, make_events(1)).await.unwrap();
    assert_eq!(event_numbers(&next_batch(&mut second_inbox).await), vec![2]);
}
