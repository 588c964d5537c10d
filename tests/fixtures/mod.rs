// Fixtures shared by the integration tests.

use in_memory_event_store::core::event::EventData;

/// Opt into engine logs with e.g. RUST_LOG=debug. Safe to call per test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn make_event(event_type: &str) -> EventData {
    EventData::new(event_type, serde_json::json!({"fixture": event_type}))
}

pub fn make_events(count: usize) -> Vec<EventData> {
    (0..count)
        .map(|index| make_event(&format!("test_event_{index}")))
        .collect()
}
