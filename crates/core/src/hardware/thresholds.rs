//! Threshold tables for the thermal, power and neural channels.
//!
//! The tables are plain data until they pass [`ThresholdTables::new`]; the
//! monitor loop only ever evaluates against a validated [`ThresholdTables`],
//! which has no mutation API.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Temperature limits in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalThresholds {
    /// Start monitoring closely.
    pub warning_threshold: f64,
    /// Begin auto-throttling.
    pub throttling_threshold: f64,
    /// Prepare for emergency shutdown.
    pub critical_threshold: f64,
    /// Immediate shutdown.
    pub emergency_threshold: f64,
    /// Absolute maximum; the emergency threshold may never exceed it.
    pub max_allowed: f64,
}

impl Default for ThermalThresholds {
    fn default() -> Self {
        Self {
            warning_threshold: 45.0,
            throttling_threshold: 50.0,
            critical_threshold: 55.0,
            emergency_threshold: 60.0,
            max_allowed: 60.0,
        }
    }
}

impl ThermalThresholds {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require_finite("thermal.warning_threshold", self.warning_threshold)?;
        require_finite("thermal.throttling_threshold", self.throttling_threshold)?;
        require_finite("thermal.critical_threshold", self.critical_threshold)?;
        require_finite("thermal.emergency_threshold", self.emergency_threshold)?;
        require_finite("thermal.max_allowed", self.max_allowed)?;

        if self.emergency_threshold > self.max_allowed {
            return Err(ConfigurationError::ThermalCeiling {
                emergency: self.emergency_threshold,
                max_allowed: self.max_allowed,
            });
        }
        Ok(())
    }
}

/// Supply current limits in mA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerThresholds {
    pub normal_current_ma: f64,
    pub warning_current_ma: f64,
    pub critical_current_ma: f64,
    /// Absolute maximum (2 A by default). Reaching it is a power surge.
    pub max_current_ma: f64,
    /// Hardware current limit; may never exceed `max_current_ma`.
    pub current_limit_ma: f64,
}

impl Default for PowerThresholds {
    fn default() -> Self {
        Self {
            normal_current_ma: 100.0,
            warning_current_ma: 500.0,
            critical_current_ma: 1000.0,
            max_current_ma: 2000.0,
            current_limit_ma: 1500.0,
        }
    }
}

impl PowerThresholds {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require_finite("power.normal_current_ma", self.normal_current_ma)?;
        require_finite("power.warning_current_ma", self.warning_current_ma)?;
        require_finite("power.critical_current_ma", self.critical_current_ma)?;
        require_finite("power.max_current_ma", self.max_current_ma)?;
        require_finite("power.current_limit_ma", self.current_limit_ma)?;

        if self.current_limit_ma > self.max_current_ma {
            return Err(ConfigurationError::CurrentLimit {
                limit: self.current_limit_ma,
                max: self.max_current_ma,
            });
        }
        Ok(())
    }
}

/// Neural activity (EEG amplitude) limits in μV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeuralThresholds {
    pub normal_eeg_uv: f64,
    /// Potential seizure activity: alert and disconnect the interface.
    pub seizure_threshold_uv: f64,
    /// Dangerous activity: immediate shutdown.
    pub critical_threshold_uv: f64,
    pub sampling_rate_hz: u32,
}

impl Default for NeuralThresholds {
    fn default() -> Self {
        Self {
            normal_eeg_uv: 100.0,
            seizure_threshold_uv: 500.0,
            critical_threshold_uv: 1000.0,
            sampling_rate_hz: 256,
        }
    }
}

impl NeuralThresholds {
    /// Only rejects non-finite values; the ordering of the neural ladder is
    /// not cross-checked.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require_finite("neural.normal_eeg_uv", self.normal_eeg_uv)?;
        require_finite("neural.seizure_threshold_uv", self.seizure_threshold_uv)?;
        require_finite("neural.critical_threshold_uv", self.critical_threshold_uv)?;
        Ok(())
    }
}

/// The validated set of all three channel tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdTables {
    thermal: ThermalThresholds,
    power: PowerThresholds,
    neural: NeuralThresholds,
}

impl ThresholdTables {
    /// Validate and freeze the three tables.
    pub fn new(
        thermal: ThermalThresholds,
        power: PowerThresholds,
        neural: NeuralThresholds,
    ) -> Result<Self, ConfigurationError> {
        thermal.validate()?;
        power.validate()?;
        neural.validate()?;
        Ok(Self {
            thermal,
            power,
            neural,
        })
    }

    pub fn thermal(&self) -> &ThermalThresholds {
        &self.thermal
    }

    pub fn power(&self) -> &PowerThresholds {
        &self.power
    }

    pub fn neural(&self) -> &NeuralThresholds {
        &self.neural
    }
}

impl Default for ThresholdTables {
    fn default() -> Self {
        Self {
            thermal: ThermalThresholds::default(),
            power: PowerThresholds::default(),
            neural: NeuralThresholds::default(),
        }
    }
}

fn require_finite(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::NonFinite { field, value })
    }
}
