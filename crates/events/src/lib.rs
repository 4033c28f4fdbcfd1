//! NeuroACon safety event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SafetyEvent`]: the envelope for alerts, shutdowns and process
//!   violations published by the monitor.
//!
//! The bus complements the monitor's synchronous callbacks: publishing never
//! blocks, and a slow subscriber only loses its own oldest events.

pub mod bus;

pub use bus::{EventBus, SafetyEvent};
