//! `neuroacon-monitor` library crate.
//!
//! The fail-safe threshold escalation and emergency-shutdown monitor. The
//! daemon entrypoint lives in `main.rs`.
//!
//! - [`SafetyMonitor`]: lifecycle, monitoring loop, shutdown trigger,
//!   process authorization and metrics.
//! - [`sensors`] / [`actuators`]: injection points for real hardware.
//! - [`callbacks`]: synchronous shutdown and alert subscribers.
//! - [`config`]: loop settings and threshold tables, loadable from the
//!   environment.

pub mod actuators;
pub mod callbacks;
pub mod config;
pub mod metrics;
pub mod monitor;
pub mod sensors;

pub use actuators::{Actuator, LoggingActuator};
pub use config::MonitorConfig;
pub use metrics::SafetyMetrics;
pub use monitor::{MonitorPhase, SafetyMonitor, SafetyMonitorBuilder, StopOutcome};
pub use sensors::{InjectableSensors, SensorReader};
