//! Post-commit event fan-out.
//!
//! Stand-in for the external real-time/notification channel. Events are
//! published strictly *after* a transaction commits, are at-most-once,
//! and are allowed to go nowhere: a publish failure is logged and never
//! propagated into the financial path.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::money::Cents;

/// Broadcast capacity; slow subscribers lag and drop, they never block
const EVENT_CAPACITY: usize = 256;

/// Events emitted after committed financial mutations
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawEvent {
    PoolUpdated {
        draw_id: String,
        prize_pool: Cents,
        total_entries: u64,
    },
    DrawLocked {
        draw_id: String,
    },
    WinnerDrawn {
        draw_id: String,
        winner_id: String,
        winner_amount: Cents,
    },
    LobbyPotUpdated {
        lobby_id: String,
        prize_pool: Cents,
    },
    LobbyWinnerDrawn {
        lobby_id: String,
        winner_id: String,
        winner_amount: Cents,
    },
}

/// Fire-and-forget event bus
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DrawEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribe to future events (e.g. a push-notification relay)
    pub fn subscribe(&self) -> broadcast::Receiver<DrawEvent> {
        self.tx.subscribe()
    }

    /// Best-effort publish. With no live subscribers the event is simply
    /// dropped; that is expected and must not surface as an error.
    pub fn publish(&self, event: DrawEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(error = %e, "event dropped: no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(DrawEvent::DrawLocked {
            draw_id: "d1".to_string(),
        });
    }

    #[test]
    fn test_subscriber_receives_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(DrawEvent::PoolUpdated {
            draw_id: "d1".to_string(),
            prize_pool: 300,
            total_entries: 3,
        });
        let event = rx.try_recv().unwrap();
        match event {
            DrawEvent::PoolUpdated { prize_pool, .. } => assert_eq!(prize_pool, 300),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
