//! Safety levels, shutdown reasons and sensor channel identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Aggregate risk classification.
///
/// Totally ordered: `Normal < Warning < Critical < Emergency`, so the
/// aggregate level of several channels is simply their maximum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    #[default]
    Normal,
    Warning,
    Critical,
    Emergency,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged cause of an emergency shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    ThermalRunaway,
    PowerSurge,
    NeuralAnomaly,
    UnauthorizedProcess,
    ManualOverride,
    SystemFailure,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThermalRunaway => "thermal_runaway",
            Self::PowerSurge => "power_surge",
            Self::NeuralAnomaly => "neural_anomaly",
            Self::UnauthorizedProcess => "unauthorized_process",
            Self::ManualOverride => "manual_override",
            Self::SystemFailure => "system_failure",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three independently sampled sensor channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Thermal,
    Power,
    Neural,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thermal => "thermal",
            Self::Power => "power",
            Self::Neural => "neural",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
