//! Pure domain logic for the NeuroACon safety monitor.
//!
//! Nothing in this crate performs I/O or needs an async runtime:
//!
//! - [`levels`]: safety levels, shutdown reasons, sensor channels.
//! - [`error`]: the configuration / lifecycle / sensor / callback error taxonomy.
//! - [`hardware`]: threshold tables and per-channel evaluation.
//! - [`restrictions`]: process restriction rules and the authorization gate.
//! - [`state`]: the safety state record and bounded reading histories.

pub mod error;
pub mod event_types;
pub mod hardware;
pub mod levels;
pub mod restrictions;
pub mod state;
pub mod types;

pub use error::{CallbackFault, CallbackKind, ConfigurationError, LifecycleError, SensorFault};
pub use levels::{Channel, SafetyLevel, ShutdownReason};
