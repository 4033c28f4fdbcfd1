//! Protective actuation hooks.
//!
//! The monitor decides *when* to throttle, limit current or disconnect the
//! neural interface; an [`Actuator`] implementation decides *how*. Hooks are
//! invoked synchronously on the monitoring loop and must not block.

use neuroacon_core::hardware::{ChannelVerdict, ProtectiveAction};

pub trait Actuator: Send + Sync {
    /// Reduce heat output (CPU frequency, load shedding).
    fn throttle(&self, temperature_c: f64);
    /// Engage current-limiting circuits.
    fn limit_current(&self, current_ma: f64);
    /// Open the neural interface circuit breakers.
    fn disconnect_neural_interface(&self, neural_uv: f64);
}

/// Route a verdict's requested action to the matching hook.
pub fn apply(actuator: &dyn Actuator, verdict: &ChannelVerdict) {
    match verdict.action {
        Some(ProtectiveAction::Throttle) => actuator.throttle(verdict.value),
        Some(ProtectiveAction::LimitCurrent) => actuator.limit_current(verdict.value),
        Some(ProtectiveAction::DisconnectNeuralInterface) => {
            actuator.disconnect_neural_interface(verdict.value)
        }
        None => {}
    }
}

/// Actuator that only logs; used where no hardware is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActuator;

impl Actuator for LoggingActuator {
    fn throttle(&self, temperature_c: f64) {
        tracing::info!(temperature_c, "Initiating CPU throttling");
    }

    fn limit_current(&self, current_ma: f64) {
        tracing::info!(current_ma, "Limiting current to safe levels");
    }

    fn disconnect_neural_interface(&self, neural_uv: f64) {
        tracing::info!(neural_uv, "Disconnecting neural interface");
    }
}
