//! The safety state record and bounded reading histories.

use std::collections::VecDeque;

use serde::Serialize;

use crate::hardware::Readings;
use crate::levels::{SafetyLevel, ShutdownReason};
use crate::types::Timestamp;

/// Default number of readings kept per channel (~100 s at 10 Hz).
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Length a history is cut back to once it overflows.
pub const DEFAULT_HISTORY_TRIM_TO: usize = 500;

/// Largest accepted per-channel history capacity.
pub const MAX_HISTORY_CAPACITY: usize = 1_000_000;

/// Current state of the safety system.
///
/// Owned by the monitor and handed to callers only as a copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SafetyState {
    pub is_active: bool,
    /// Sticky: once set it is never cleared for the lifetime of the monitor.
    pub is_emergency: bool,
    pub current_temperature: f64,
    pub current_current_ma: f64,
    pub neural_activity_uv: f64,
    pub safety_level: SafetyLevel,
    pub last_shutdown: Option<Timestamp>,
    /// Cause of the one and only shutdown.
    pub last_shutdown_reason: Option<ShutdownReason>,
    pub shutdown_count: u64,
    pub total_violations: u64,
}

impl SafetyState {
    pub fn record_readings(&mut self, readings: &Readings) {
        self.current_temperature = readings.temperature_c;
        self.current_current_ma = readings.current_ma;
        self.neural_activity_uv = readings.neural_uv;
    }

    /// Enter the emergency state.
    ///
    /// Returns `false` without touching anything if already in emergency,
    /// so repeated breaches cannot trigger a second shutdown.
    pub fn enter_emergency(&mut self, reason: ShutdownReason, at: Timestamp) -> bool {
        if self.is_emergency {
            return false;
        }
        self.is_emergency = true;
        self.last_shutdown = Some(at);
        self.last_shutdown_reason = Some(reason);
        self.shutdown_count += 1;
        self.safety_level = SafetyLevel::Emergency;
        true
    }
}

/// Bounded history of one channel's readings, used only for averaging.
///
/// When a push takes the length past `capacity` the oldest readings are
/// dropped until `trim_to` remain.
#[derive(Debug, Clone)]
pub struct ReadingHistory {
    samples: VecDeque<f64>,
    capacity: usize,
    trim_to: usize,
}

impl ReadingHistory {
    pub fn new(capacity: usize, trim_to: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY).saturating_add(1)),
            capacity,
            trim_to: trim_to.min(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.samples.push_back(value);
        if self.samples.len() > self.capacity {
            let excess = self.samples.len() - self.trim_to;
            self.samples.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean of the retained readings, `0.0` when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }
}

impl Default for ReadingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_TRIM_TO)
    }
}
