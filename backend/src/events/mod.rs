//! Event Bus (C10): fans out scheduling mutations to every connected
//! `/api/sync/stream` subscriber. Grounded in `sync_service.py`'s
//! asyncio.Queue pub/sub, translated to a `tokio::sync::broadcast` channel
//! (the idiomatic Rust equivalent per the source's own "re-architecture"
//! note on SSE: generator → task + broadcast channel).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventKind {
    WorkCreated,
    WorkUpdated,
    WorkDeleted,
    ChunkAssigned,
    ChunkUnassigned,
    ChunkStatusChanged,
    SessionCreated,
    SessionApplied,
    SessionCancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    pub event_type: SyncEventKind,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<String>,
}

/// Channel capacity large enough to absorb a burst from `assign_all_chunks`
/// without lagging subscribers; a subscriber that falls behind by more than
/// this just skips ahead rather than blocking publishers.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Publishing with no subscribers is normal (no stream connected yet)
    /// and not an error.
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SyncEvent {
            event_type: SyncEventKind::ChunkAssigned,
            entity_id: "chunk-1".into(),
            data: serde_json::json!({}),
            timestamp: Utc::now(),
            actor_id: None,
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.entity_id, "chunk-1");
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(SyncEvent {
            event_type: SyncEventKind::WorkUpdated,
            entity_id: "w-1".into(),
            data: serde_json::json!({}),
            timestamp: Utc::now(),
            actor_id: None,
        });
    }
}
