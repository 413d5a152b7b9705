//! Modification notifications.

use serde::Serialize;
use tokio::sync::broadcast;

/// Identifier of the event fired whenever a storage's contents change.
pub const MODIFIED_EVENT: &str = "storage:modified";

/// Payload broadcast to modification listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageEvent {
    pub event: &'static str,
    /// Name of the storage that changed
    pub name: String,
}

impl StorageEvent {
    pub fn modified(name: impl Into<String>) -> Self {
        Self {
            event: MODIFIED_EVENT,
            name: name.into(),
        }
    }
}

/// Fires events to external listeners. Must never fail.
pub trait EventEmitter: Send + Sync {
    fn fire(&self, event: StorageEvent);
}

// == Broadcast Emitter ==
/// Fans events out over a tokio broadcast channel.
///
/// Events fired while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    sender: broadcast::Sender<StorageEvent>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEmitter {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventEmitter for BroadcastEmitter {
    fn fire(&self, event: StorageEvent) {
        // Err only means there are no receivers
        let _ = self.sender.send(event);
    }
}
