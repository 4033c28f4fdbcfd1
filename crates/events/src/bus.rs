//! In-process safety event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is designed to be shared via `Arc<EventBus>` between the
//! monitor and any number of observers (loggers, telemetry uplinks, UIs).

use chrono::Utc;
use neuroacon_core::event_types::{EVENT_ALERT, EVENT_PROCESS_VIOLATION, EVENT_SHUTDOWN};
use neuroacon_core::restrictions::ViolationRecord;
use neuroacon_core::types::Timestamp;
use neuroacon_core::{SafetyLevel, ShutdownReason};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// SafetyEvent
// ---------------------------------------------------------------------------

/// Something safety-relevant that happened on the device.
///
/// Built with one of the named constructors and optionally enriched with
/// [`with_payload`](SafetyEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyEvent {
    /// Dot-separated event name, see [`neuroacon_core::event_types`].
    pub event_type: String,

    /// Severity at which the event was raised.
    pub level: SafetyLevel,

    /// Human-readable summary.
    pub message: String,

    /// Event-specific structured data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl SafetyEvent {
    /// Create an event with an empty payload.
    pub fn new(event_type: impl Into<String>, level: SafetyLevel, message: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            level,
            message: message.into(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// An alert dispatched to the alert callbacks.
    pub fn alert(level: SafetyLevel, message: impl Into<String>) -> Self {
        Self::new(EVENT_ALERT, level, message)
    }

    /// The monitor entered its emergency state.
    pub fn shutdown(reason: ShutdownReason) -> Self {
        Self::new(
            EVENT_SHUTDOWN,
            SafetyLevel::Emergency,
            format!("Emergency shutdown: {reason}"),
        )
        .with_payload(serde_json::json!({ "reason": reason }))
    }

    /// An authorization check matched a restriction.
    pub fn process_violation(record: &ViolationRecord, authorized: bool) -> Self {
        let message = if authorized {
            format!("Process {} allowed with safeguards", record.process)
        } else {
            format!("Process {} blocked", record.process)
        };
        Self::new(EVENT_PROCESS_VIOLATION, record.risk_level, message).with_payload(
            serde_json::json!({
                "process": record.process,
                "restriction": record.restriction_name,
                "authorized": authorized,
            }),
        )
    }

    /// Replace the JSON payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for [`SafetyEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<SafetyEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`; the publisher never waits.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns how many subscribers it was queued for; with no subscribers
    /// the event is dropped.
    pub fn publish(&self, event: SafetyEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(event_type = %event.event_type, "No subscribers for safety event");
                0
            }
        }
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SafetyEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
