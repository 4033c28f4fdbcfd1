//! Sensor threshold domain logic.
//!
//! Contains the threshold tables and the per-channel evaluation engine.
//! All logic in this module is pure (no sensor access); the monitor loop
//! samples the channels and passes the readings in.

pub mod evaluation;
pub mod thresholds;

pub use evaluation::{aggregate_level, ChannelVerdict, ProtectiveAction, Readings};
pub use thresholds::{NeuralThresholds, PowerThresholds, ThermalThresholds, ThresholdTables};
