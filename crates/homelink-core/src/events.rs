//! Bridge event system for reconciliation and push notifications.
//!
//! Events give hosts a way to observe what the engine did without hooking
//! the presentation layer: state applications, skipped refreshes, push
//! outcomes, transport fallbacks, faults and low batteries.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::transport::TransportKind;

/// Events emitted by the reconciliation engine.
///
/// All events are serializable for logging, persistence, and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum BridgeEvent {
    /// A parsed state was applied to the presentation layer.
    StateApplied {
        /// Device id.
        device_id: String,
        /// Transport that produced the state.
        transport: TransportKind,
    },
    /// A scheduled refresh deliberately did not run.
    RefreshSkipped {
        /// Device id.
        device_id: String,
        /// Why the refresh was skipped.
        reason: String,
    },
    /// An outbound change was delivered.
    PushSucceeded {
        /// Device id.
        device_id: String,
        /// Transport that delivered the command.
        transport: TransportKind,
        /// Target value that was pushed.
        target: bool,
    },
    /// An outbound change ultimately failed.
    PushFailed {
        /// Device id.
        device_id: String,
        /// Rendered error.
        error: String,
    },
    /// A failed preferred transport was retried via the secondary one.
    FallbackEngaged {
        /// Device id.
        device_id: String,
        /// Transport that failed.
        from: TransportKind,
        /// Transport used instead.
        to: TransportKind,
    },
    /// A transport call failed and fault markers were written.
    DeviceFault {
        /// Device id.
        device_id: String,
        /// Rendered error.
        error: String,
    },
    /// A battery reading at or below the configured threshold.
    BatteryLow {
        /// Device id.
        device_id: String,
        /// Battery percentage.
        level: u8,
    },
}

/// Sender for bridge events.
pub type EventSender = broadcast::Sender<BridgeEvent>;

/// Receiver for bridge events.
pub type EventReceiver = broadcast::Receiver<BridgeEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: BridgeEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
