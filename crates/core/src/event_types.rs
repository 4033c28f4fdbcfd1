//! Well-known safety event type names.
//!
//! Used by the monitor when publishing on the event bus and by subscribers
//! when filtering what they receive.

/// An alert was dispatched to the alert callbacks.
pub const EVENT_ALERT: &str = "safety.alert";

/// The monitor entered its terminal emergency state.
pub const EVENT_SHUTDOWN: &str = "safety.shutdown";

/// A process name matched a restriction during an authorization check.
pub const EVENT_PROCESS_VIOLATION: &str = "process.violation";
