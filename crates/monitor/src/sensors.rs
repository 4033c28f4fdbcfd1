//! Sensor channel readers.
//!
//! Real drivers are a deployment concern: implement [`SensorReader`] for
//! the hardware and hand it to the monitor. [`InjectableSensors`] holds
//! values set from outside and doubles as the placeholder source for hosts
//! without sensors.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use neuroacon_core::hardware::Readings;
use neuroacon_core::{Channel, SensorFault};

/// The three abstract channel capabilities the monitor polls each tick.
///
/// Reads happen on the monitoring loop and have no timeout, so they must
/// return promptly.
pub trait SensorReader: Send + Sync {
    /// Temperature in °C.
    fn temperature(&self) -> Result<f64, SensorFault>;
    /// Supply current in mA.
    fn current(&self) -> Result<f64, SensorFault>;
    /// Neural activity amplitude in μV.
    fn neural_signal(&self) -> Result<f64, SensorFault>;
}

/// Sample all three channels, rejecting non-finite values.
pub fn sample(reader: &dyn SensorReader) -> Result<Readings, SensorFault> {
    Ok(Readings {
        temperature_c: finite(Channel::Thermal, reader.temperature()?)?,
        current_ma: finite(Channel::Power, reader.current()?)?,
        neural_uv: finite(Channel::Neural, reader.neural_signal()?)?,
    })
}

fn finite(channel: Channel, value: f64) -> Result<f64, SensorFault> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SensorFault::NonFinite { channel, value })
    }
}

#[derive(Debug, Default)]
struct Injected {
    readings: Readings,
    faults: HashMap<Channel, String>,
}

/// Sensor source whose readings and faults are set by the caller.
///
/// All channels read `0.0` until told otherwise.
#[derive(Debug, Default)]
pub struct InjectableSensors {
    inner: Mutex<Injected>,
}

impl InjectableSensors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_temperature(&self, celsius: f64) {
        self.with_inner(|i| i.readings.temperature_c = celsius);
    }

    pub fn set_current(&self, milliamps: f64) {
        self.with_inner(|i| i.readings.current_ma = milliamps);
    }

    pub fn set_neural_signal(&self, microvolts: f64) {
        self.with_inner(|i| i.readings.neural_uv = microvolts);
    }

    /// Make every subsequent read of `channel` fail with `reason`.
    pub fn fail(&self, channel: Channel, reason: impl Into<String>) {
        let reason = reason.into();
        self.with_inner(|i| {
            i.faults.insert(channel, reason);
        });
    }

    pub fn clear_faults(&self) {
        self.with_inner(|i| i.faults.clear());
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Injected) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn read(&self, channel: Channel, pick: fn(&Readings) -> f64) -> Result<f64, SensorFault> {
        self.with_inner(|i| match i.faults.get(&channel) {
            Some(reason) => Err(SensorFault::read_failed(channel, reason.clone())),
            None => Ok(pick(&i.readings)),
        })
    }
}

impl SensorReader for InjectableSensors {
    fn temperature(&self) -> Result<f64, SensorFault> {
        self.read(Channel::Thermal, |r| r.temperature_c)
    }

    fn current(&self) -> Result<f64, SensorFault> {
        self.read(Channel::Power, |r| r.current_ma)
    }

    fn neural_signal(&self) -> Result<f64, SensorFault> {
        self.read(Channel::Neural, |r| r.neural_uv)
    }
}
