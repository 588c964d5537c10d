// Fixtures for unit tests.

use crate::core::event::EventData;

pub fn make_event(event_type: &str) -> EventData {
    EventData::new(event_type, serde_json::json!({"fixture": event_type}))
}

pub fn make_events(count: usize) -> Vec<EventData> {
    (0..count)
        .map(|index| make_event(&format!("test_event_{index}")))
        .collect()
}
