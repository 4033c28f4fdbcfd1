//! Point-in-time safety metrics snapshot.

use neuroacon_core::types::Timestamp;
use neuroacon_core::{SafetyLevel, ShutdownReason};
use serde::Serialize;

/// Everything the orchestrator reports about the monitor, read under a
/// single lock acquisition so the fields are mutually consistent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyMetrics {
    pub is_active: bool,
    pub is_emergency: bool,
    pub safety_level: SafetyLevel,
    pub current_temperature: f64,
    #[serde(rename = "current_current")]
    pub current_current_ma: f64,
    #[serde(rename = "neural_activity")]
    pub neural_activity_uv: f64,
    pub shutdown_count: u64,
    pub total_violations: u64,
    pub last_shutdown: Option<Timestamp>,
    pub last_shutdown_reason: Option<ShutdownReason>,
    /// Running average of the retained temperature history.
    pub thermal_history_avg: f64,
    pub current_history_avg: f64,
    pub neural_history_avg: f64,
    pub process_violations_count: usize,
    /// Ticks completed since construction.
    pub tick_count: u64,
}

impl SafetyMetrics {
    /// The metrics as a JSON object keyed by field name.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            // A plain struct of scalars always serializes to an object.
            _ => serde_json::Map::new(),
        }
    }
}
