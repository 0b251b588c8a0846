use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use utoipa::ToSchema;

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityEventKind {
    Initial,
    Update,
}

/// A per-SKU availability snapshot pushed to WS subscribers (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityMessage {
    #[serde(rename = "type")]
    pub kind: AvailabilityEventKind,
    pub sku: String,
    pub available: i64,
    pub total: i64,
}

/// Per-SKU multiplexer over long-lived subscriber streams. Delivery is
/// best-effort: a subscriber with no receiver left (or a full,
/// never-drained one) simply stops receiving future updates — there is no
/// retention or replay (§4.8). The map is a `DashMap` so concurrent
/// subscribe/broadcast/disconnect never contend on a single lock (§5).
#[derive(Clone, Default)]
pub struct AvailabilityBroadcaster {
    channels: DashMap<String, broadcast::Sender<AvailabilityMessage>>,
}

impl AvailabilityBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, sku: &str) -> broadcast::Sender<AvailabilityMessage> {
        self.channels
            .entry(sku.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Registers a new subscriber for `sku`, returning a receiver the
    /// caller should forward onto its WS stream. The caller is
    /// responsible for sending the `initial` snapshot first (recomputed
    /// from authoritative state, not cached here).
    pub fn subscribe(&self, sku: &str) -> broadcast::Receiver<AvailabilityMessage> {
        self.sender_for(sku).subscribe()
    }

    /// Best-effort fan-out to every live subscriber of `sku`. A send
    /// error here just means there are currently no receivers — not a
    /// failure worth surfacing to the caller.
    pub fn broadcast(&self, message: AvailabilityMessage) {
        let sender = self.sender_for(&message.sku);
        let _ = sender.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_broadcast_update() {
        let broadcaster = AvailabilityBroadcaster::new();
        let mut rx = broadcaster.subscribe("SKU-1");

        broadcaster.broadcast(AvailabilityMessage {
            kind: AvailabilityEventKind::Update,
            sku: "SKU-1".to_string(),
            available: 4,
            total: 10,
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.available, 4);
        assert_eq!(received.sku, "SKU-1");
    }

    #[tokio::test]
    async fn broadcast_with_no_subscribers_does_not_panic() {
        let broadcaster = AvailabilityBroadcaster::new();
        broadcaster.broadcast(AvailabilityMessage {
            kind: AvailabilityEventKind::Update,
            sku: "SKU-2".to_string(),
            available: 1,
            total: 1,
        });
    }
}
