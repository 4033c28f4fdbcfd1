use std::fmt;

use crate::levels::Channel;

/// Invalid threshold ordering or monitor setting.
///
/// Fatal at `initialize()`; values are never silently clamped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Emergency threshold ({emergency}°C) exceeds max allowed ({max_allowed}°C)")]
    ThermalCeiling { emergency: f64, max_allowed: f64 },

    #[error("Current limit ({limit}mA) exceeds max ({max}mA)")]
    CurrentLimit { limit: f64, max: f64 },

    #[error("Threshold {field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("Invalid pattern for restriction '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },
}

/// Operation invoked out of lifecycle order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Safety monitor must be initialized before starting")]
    NotInitialized,

    #[error("Safety monitor can only be started from within a tokio runtime")]
    NoRuntime,
}

/// Failure while sampling a sensor channel during a tick.
///
/// Never returned to callers of the public API: the loop converts it into a
/// `SystemFailure` shutdown.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorFault {
    #[error("{channel} sensor read failed: {reason}")]
    ReadFailed { channel: Channel, reason: String },

    #[error("{channel} sensor returned a non-finite reading ({value})")]
    NonFinite { channel: Channel, value: f64 },

    #[error("Monitoring tick panicked: {0}")]
    Panicked(String),
}

impl SensorFault {
    pub fn read_failed(channel: Channel, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            channel,
            reason: reason.into(),
        }
    }
}

/// Which subscriber list a faulting callback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Shutdown,
    Alert,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown"),
            Self::Alert => f.write_str("alert"),
        }
    }
}

/// A subscriber panicked while being notified.
///
/// Isolated per subscriber: logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} callback #{index} panicked: {message}")]
pub struct CallbackFault {
    pub kind: CallbackKind,
    pub index: usize,
    pub message: String,
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = ConfigurationError::ThermalCeiling {
            emergency: 70.0,
            max_allowed: 60.0,
        };
        assert_eq!(
            err.to_string(),
            "Emergency threshold (70°C) exceeds max allowed (60°C)"
        );

        let fault = SensorFault::read_failed(Channel::Power, "bus timeout");
        assert_eq!(fault.to_string(), "power sensor read failed: bus timeout");
    }

    #[test]
    fn panic_message_handles_both_payload_kinds() {
        let static_payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(static_payload.as_ref()), "boom");

        let owned_payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(owned_payload.as_ref()), "bang");

        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
