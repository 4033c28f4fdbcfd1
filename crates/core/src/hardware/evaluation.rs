//! Per-channel threshold evaluation.
//!
//! Each channel compares its fresh reading against its own ladder, highest
//! tier first, and produces a [`ChannelVerdict`]: the level it contributes to
//! the aggregate, plus the alert, protective action or shutdown the monitor
//! must carry out. The caller is responsible for dispatching them.

use crate::hardware::thresholds::{
    NeuralThresholds, PowerThresholds, ThermalThresholds, ThresholdTables,
};
use crate::levels::{Channel, SafetyLevel, ShutdownReason};

/// One sample of all three channels taken during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    pub temperature_c: f64,
    pub current_ma: f64,
    pub neural_uv: f64,
}

/// Abstract actuation hook requested by an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectiveAction {
    Throttle,
    LimitCurrent,
    DisconnectNeuralInterface,
}

/// Outcome of evaluating a single channel reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelVerdict {
    pub channel: Channel,
    pub value: f64,
    /// Contribution to the aggregate safety level.
    pub level: SafetyLevel,
    /// Alert message; dispatched at `level`.
    pub alert: Option<String>,
    pub action: Option<ProtectiveAction>,
    pub shutdown: Option<ShutdownReason>,
}

impl ChannelVerdict {
    fn new(channel: Channel, value: f64, level: SafetyLevel) -> Self {
        Self {
            channel,
            value,
            level,
            alert: None,
            action: None,
            shutdown: None,
        }
    }

    fn with_alert(mut self, message: String) -> Self {
        self.alert = Some(message);
        self
    }

    fn with_action(mut self, action: ProtectiveAction) -> Self {
        self.action = Some(action);
        self
    }

    fn with_shutdown(mut self, reason: ShutdownReason) -> Self {
        self.shutdown = Some(reason);
        self
    }
}

pub fn evaluate_thermal(temperature_c: f64, t: &ThermalThresholds) -> ChannelVerdict {
    let verdict = |level| ChannelVerdict::new(Channel::Thermal, temperature_c, level);

    if temperature_c >= t.emergency_threshold {
        verdict(SafetyLevel::Emergency).with_shutdown(ShutdownReason::ThermalRunaway)
    } else if temperature_c >= t.critical_threshold {
        verdict(SafetyLevel::Critical)
            .with_alert(format!("Temperature critical: {temperature_c:.1}°C"))
            .with_action(ProtectiveAction::Throttle)
    } else if temperature_c >= t.throttling_threshold {
        verdict(SafetyLevel::Warning)
            .with_alert(format!("Temperature elevated: {temperature_c:.1}°C"))
            .with_action(ProtectiveAction::Throttle)
    } else if temperature_c >= t.warning_threshold {
        verdict(SafetyLevel::Warning)
            .with_alert(format!("Temperature rising: {temperature_c:.1}°C"))
    } else {
        verdict(SafetyLevel::Normal)
    }
}

/// The warning tier only raises the aggregate level; it has no alert.
pub fn evaluate_power(current_ma: f64, t: &PowerThresholds) -> ChannelVerdict {
    let verdict = |level| ChannelVerdict::new(Channel::Power, current_ma, level);

    if current_ma >= t.max_current_ma {
        verdict(SafetyLevel::Emergency).with_shutdown(ShutdownReason::PowerSurge)
    } else if current_ma >= t.critical_current_ma {
        verdict(SafetyLevel::Critical)
            .with_alert(format!("Current critical: {current_ma:.1}mA"))
            .with_action(ProtectiveAction::LimitCurrent)
    } else if current_ma >= t.warning_current_ma {
        verdict(SafetyLevel::Warning)
    } else {
        verdict(SafetyLevel::Normal)
    }
}

pub fn evaluate_neural(neural_uv: f64, t: &NeuralThresholds) -> ChannelVerdict {
    let verdict = |level| ChannelVerdict::new(Channel::Neural, neural_uv, level);

    if neural_uv >= t.critical_threshold_uv {
        verdict(SafetyLevel::Emergency).with_shutdown(ShutdownReason::NeuralAnomaly)
    } else if neural_uv >= t.seizure_threshold_uv {
        verdict(SafetyLevel::Critical)
            .with_alert(format!("Neural anomaly detected: {neural_uv:.1}μV"))
            .with_action(ProtectiveAction::DisconnectNeuralInterface)
    } else {
        verdict(SafetyLevel::Normal)
    }
}

impl ThresholdTables {
    /// Evaluate all three channels, in thermal / power / neural order.
    pub fn evaluate(&self, readings: &Readings) -> [ChannelVerdict; 3] {
        [
            evaluate_thermal(readings.temperature_c, self.thermal()),
            evaluate_power(readings.current_ma, self.power()),
            evaluate_neural(readings.neural_uv, self.neural()),
        ]
    }
}

/// Maximum level across the verdicts, pinned to `Emergency` once the
/// emergency flag is set.
pub fn aggregate_level(verdicts: &[ChannelVerdict], is_emergency: bool) -> SafetyLevel {
    if is_emergency {
        return SafetyLevel::Emergency;
    }
    verdicts
        .iter()
        .map(|v| v.level)
        .max()
        .unwrap_or(SafetyLevel::Normal)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
