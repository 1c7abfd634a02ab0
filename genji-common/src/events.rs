//! Event types for the Genji newsfeed
//!
//! Provides the shared event definitions and the EventBus the core emits
//! into. Downstream broadcasters (newsfeed channel poster, SSE clients)
//! subscribe; the core never waits on them.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::UserId;

/// A managed role as reported in events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: u64,
    pub name: String,
}

/// Genji event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenjiEvent {
    /// A player's tier roles changed after reconciliation
    ///
    /// Triggers:
    /// - Newsfeed: announce promotions
    RankChanged {
        user_id: UserId,
        nickname: String,
        rank: u32,
        rank_plus: u32,
        added: Vec<RoleRef>,
        removed: Vec<RoleRef>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new map was accepted into the catalog
    ///
    /// Triggers:
    /// - Newsfeed: new map announcement
    MapSubmitted {
        user_id: UserId,
        nickname: String,
        map_name: String,
        /// Creator grade, e.g. "Hard +"
        difficulty: String,
        map_code: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl GenjiEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            GenjiEvent::RankChanged { .. } => "RankChanged",
            GenjiEvent::MapSubmitted { .. } => "MapSubmitted",
        }
    }
}

/// Broadcast bus for newsfeed events
///
/// Emission is fire-and-forget: a bus with no subscribers drops the event.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GenjiEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GenjiEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning the number of subscribers that received it
    ///
    /// Zero subscribers is not an error for the core; it is only logged.
    pub fn emit(&self, event: GenjiEvent) -> usize {
        let event_type = event.event_type();
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(event_type, receivers, "Event emitted");
                receivers
            }
            Err(_) => {
                tracing::debug!(event_type, "Event dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
