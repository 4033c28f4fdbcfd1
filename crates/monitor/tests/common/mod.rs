#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use neuroacon_core::{SafetyLevel, ShutdownReason};
use neuroacon_monitor::{Actuator, InjectableSensors, MonitorConfig, SafetyMonitor};

/// Build a `MonitorConfig` that polls every 10 ms and gives the loop one
/// second to exit on stop.
pub fn fast_config() -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_millis(10),
        stop_timeout: Duration::from_secs(1),
        ..MonitorConfig::default()
    }
}

/// A monitor wired to injectable sensors and a recording actuator.
pub fn build_monitor(
    config: MonitorConfig,
) -> (SafetyMonitor, Arc<InjectableSensors>, Arc<RecordingActuator>) {
    let sensors = Arc::new(InjectableSensors::new());
    let actuator = Arc::new(RecordingActuator::default());
    let monitor = SafetyMonitor::builder(config)
        .sensors(sensors.clone())
        .actuator(actuator.clone())
        .build();
    (monitor, sensors, actuator)
}

/// Poll `condition` every 5 ms until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Record every shutdown reason delivered to callbacks.
pub fn record_shutdowns(monitor: &SafetyMonitor) -> Arc<Mutex<Vec<ShutdownReason>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    monitor.register_shutdown_callback(move |reason| sink.lock().unwrap().push(reason));
    seen
}

/// Record every alert delivered to callbacks.
pub fn record_alerts(monitor: &SafetyMonitor) -> Arc<Mutex<Vec<(SafetyLevel, String)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    monitor.register_alert_callback(move |level, message| {
        sink.lock().unwrap().push((level, message.to_string()));
    });
    seen
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Throttle(f64),
    LimitCurrent(f64),
    DisconnectNeural(f64),
}

#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub actions: Mutex<Vec<Action>>,
}

impl RecordingActuator {
    pub fn taken(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }
}

impl Actuator for RecordingActuator {
    fn throttle(&self, temperature_c: f64) {
        self.actions.lock().unwrap().push(Action::Throttle(temperature_c));
    }

    fn limit_current(&self, current_ma: f64) {
        self.actions.lock().unwrap().push(Action::LimitCurrent(current_ma));
    }

    fn disconnect_neural_interface(&self, neural_uv: f64) {
        self.actions.lock().unwrap().push(Action::DisconnectNeural(neural_uv));
    }
}
