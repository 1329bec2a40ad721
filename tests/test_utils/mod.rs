//! Test utilities for integration tests
#![allow(dead_code)]

use std::time::Duration;

use mindual::calendar::{EventStore, EventStoreConfig};
use mindual::chat::{ChatSession, ChatSessionBuilder};
use mindual::rag::HttpRagClient;

pub const EVENTS_BODY: &str = r#"{
    "events": [
        {"id": "e1", "date": "2025-10-20", "time": "09:00", "title": "Clean the filter", "location": "Kitchen"},
        {"id": "e2", "date": "2025-10-24", "time": "18:00", "title": "Replace the water tank", "location": ""}
    ]
}"#;

pub fn event_store(url: &str) -> EventStore {
    EventStore::new(EventStoreConfig {
        api_base_url: url.to_string(),
        limit: 10,
        timeout: Duration::from_secs(5),
    })
}

/// Creates a chat session talking to `rag_url` that refreshes the
/// returned event store from `calendar_url`. Both are usually the
/// same `mockito` server.
pub fn test_session(rag_url: &str, calendar_url: &str) -> (ChatSession, EventStore) {
    let events = event_store(calendar_url);
    let client = HttpRagClient::new(rag_url, Duration::from_secs(5));
    let session = ChatSessionBuilder::new(Box::new(client))
        .events(events.clone())
        .display_names("Tester", "Mindual")
        .build();
    (session, events)
}
