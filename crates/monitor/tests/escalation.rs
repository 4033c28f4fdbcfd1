//! Escalation and emergency-shutdown behaviour of the running monitor.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use neuroacon_core::event_types::{EVENT_ALERT, EVENT_SHUTDOWN};
use neuroacon_core::hardware::{NeuralThresholds, PowerThresholds, ThermalThresholds};
use neuroacon_core::{Channel, SafetyLevel, SensorFault, ShutdownReason};
use neuroacon_monitor::{SafetyMonitor, SensorReader};

use common::{build_monitor, fast_config, record_alerts, record_shutdowns, wait_until, Action};

const WAIT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Test: thermal runaway within one polling interval, exactly one callback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn thermal_runaway_shuts_down_within_one_interval() {
    let mut config = fast_config();
    config.interval = Duration::from_millis(100);
    config.thermal = ThermalThresholds {
        emergency_threshold: 50.0,
        ..ThermalThresholds::default()
    };
    let (monitor, sensors, _) = build_monitor(config);
    let shutdowns = record_shutdowns(&monitor);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();
    assert!(wait_until(WAIT, || monitor.metrics().tick_count >= 1).await);

    sensors.set_temperature(55.0);
    assert!(wait_until(Duration::from_millis(150), || monitor.is_emergency()).await);

    // Further ticks above the threshold do not re-trigger.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(*shutdowns.lock().unwrap(), vec![ShutdownReason::ThermalRunaway]);

    let state = monitor.snapshot_state();
    assert_eq!(state.safety_level, SafetyLevel::Emergency);
    assert_eq!(state.last_shutdown_reason, Some(ShutdownReason::ThermalRunaway));
    assert_eq!(state.shutdown_count, 1);
    assert!(state.last_shutdown.is_some());

    monitor.stop().await;
}

// ---------------------------------------------------------------------------
// Test: power surge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn power_surge_shuts_down() {
    let mut config = fast_config();
    config.power = PowerThresholds {
        max_current_ma: 1000.0,
        current_limit_ma: 900.0,
        ..PowerThresholds::default()
    };
    let (monitor, sensors, _) = build_monitor(config);
    let shutdowns = record_shutdowns(&monitor);
    sensors.set_current(1200.0);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();

    assert!(wait_until(WAIT, || monitor.is_emergency()).await);
    assert_eq!(*shutdowns.lock().unwrap(), vec![ShutdownReason::PowerSurge]);

    monitor.stop().await;
}

// ---------------------------------------------------------------------------
// Test: neural anomaly
// ---------------------------------------------------------------------------

#[tokio::test]
async fn neural_anomaly_shuts_down() {
    let mut config = fast_config();
    config.neural = NeuralThresholds {
        critical_threshold_uv: 800.0,
        ..NeuralThresholds::default()
    };
    let (monitor, sensors, _) = build_monitor(config);
    let shutdowns = record_shutdowns(&monitor);
    sensors.set_neural_signal(1000.0);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();

    assert!(wait_until(WAIT, || monitor.is_emergency()).await);
    assert_eq!(*shutdowns.lock().unwrap(), vec![ShutdownReason::NeuralAnomaly]);

    monitor.stop().await;
}

// ---------------------------------------------------------------------------
// Test: warning band raises alerts but never shuts down
// ---------------------------------------------------------------------------

#[tokio::test]
async fn warning_band_alerts_without_shutdown() {
    let (monitor, sensors, actuator) = build_monitor(fast_config());
    let shutdowns = record_shutdowns(&monitor);
    let alerts = record_alerts(&monitor);
    sensors.set_temperature(47.0);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();
    assert!(wait_until(WAIT, || monitor.metrics().tick_count >= 5).await);
    monitor.stop().await;

    assert!(!monitor.is_emergency());
    assert!(shutdowns.lock().unwrap().is_empty());
    assert_eq!(monitor.snapshot_state().safety_level, SafetyLevel::Warning);

    let alerts = alerts.lock().unwrap();
    assert!(!alerts.is_empty());
    assert!(alerts
        .iter()
        .all(|(level, message)| *level == SafetyLevel::Warning && message == "Temperature rising: 47.0°C"));
    assert!(actuator.taken().is_empty());
}

// ---------------------------------------------------------------------------
// Test: throttling band throttles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn throttling_band_invokes_throttle() {
    let mut config = fast_config();
    config.thermal = ThermalThresholds {
        warning_threshold: 40.0,
        throttling_threshold: 45.0,
        ..ThermalThresholds::default()
    };
    let (monitor, sensors, actuator) = build_monitor(config);
    let alerts = record_alerts(&monitor);
    sensors.set_temperature(46.0);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();
    assert!(wait_until(WAIT, || !actuator.taken().is_empty()).await);
    monitor.stop().await;

    assert!(!monitor.is_emergency());
    assert_eq!(monitor.snapshot_state().safety_level, SafetyLevel::Warning);
    assert_eq!(actuator.taken()[0], Action::Throttle(46.0));
    assert_eq!(
        alerts.lock().unwrap()[0],
        (SafetyLevel::Warning, "Temperature elevated: 46.0°C".to_string())
    );
}

// ---------------------------------------------------------------------------
// Test: seizure-range neural activity disconnects without shutting down
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seizure_range_disconnects_neural_interface() {
    let mut config = fast_config();
    config.neural = NeuralThresholds {
        seizure_threshold_uv: 400.0,
        ..NeuralThresholds::default()
    };
    let (monitor, sensors, actuator) = build_monitor(config);
    let alerts = record_alerts(&monitor);
    sensors.set_neural_signal(500.0);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();
    assert!(wait_until(WAIT, || !actuator.taken().is_empty()).await);
    monitor.stop().await;

    assert!(!monitor.is_emergency());
    assert_eq!(monitor.snapshot_state().safety_level, SafetyLevel::Critical);
    assert_eq!(actuator.taken()[0], Action::DisconnectNeural(500.0));
    assert_eq!(
        alerts.lock().unwrap()[0],
        (SafetyLevel::Critical, "Neural anomaly detected: 500.0μV".to_string())
    );
}

// ---------------------------------------------------------------------------
// Test: power warning tier raises the level silently
// ---------------------------------------------------------------------------

#[tokio::test]
async fn power_warning_raises_level_without_alert() {
    let (monitor, sensors, actuator) = build_monitor(fast_config());
    let alerts = record_alerts(&monitor);
    sensors.set_current(600.0);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();
    assert!(wait_until(WAIT, || monitor.metrics().tick_count >= 3).await);
    monitor.stop().await;

    assert_eq!(monitor.snapshot_state().safety_level, SafetyLevel::Warning);
    assert!(alerts.lock().unwrap().is_empty());
    assert!(actuator.taken().is_empty());
}

// ---------------------------------------------------------------------------
// Test: emergency is sticky once entered
// ---------------------------------------------------------------------------

#[tokio::test]
async fn emergency_survives_safe_readings() {
    let (monitor, sensors, actuator) = build_monitor(fast_config());
    let alerts = record_alerts(&monitor);
    sensors.set_temperature(65.0);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();
    assert!(wait_until(WAIT, || monitor.is_emergency()).await);

    // Critical current after the shutdown: readings stay live, dispatch does not.
    sensors.set_temperature(25.0);
    sensors.set_current(1200.0);
    assert!(
        wait_until(WAIT, || monitor.snapshot_state().current_temperature == 25.0).await
    );
    let ticks = monitor.metrics().tick_count;
    assert!(wait_until(WAIT, || monitor.metrics().tick_count >= ticks + 3).await);
    monitor.stop().await;

    let state = monitor.snapshot_state();
    assert!(state.is_emergency);
    assert_eq!(state.safety_level, SafetyLevel::Emergency);
    assert_eq!(state.current_current_ma, 1200.0);
    assert_eq!(state.shutdown_count, 1);
    assert!(actuator.taken().is_empty());
    assert!(alerts
        .lock()
        .unwrap()
        .iter()
        .all(|(level, _)| *level == SafetyLevel::Emergency));
}

// ---------------------------------------------------------------------------
// Test: trigger_shutdown is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_shutdown_is_idempotent() {
    let (monitor, _, _) = build_monitor(fast_config());
    let shutdowns = record_shutdowns(&monitor);
    let alerts = record_alerts(&monitor);

    assert!(monitor.trigger_shutdown(ShutdownReason::ManualOverride));
    assert!(!monitor.trigger_shutdown(ShutdownReason::PowerSurge));
    assert!(!monitor.trigger_shutdown(ShutdownReason::ManualOverride));

    assert_eq!(*shutdowns.lock().unwrap(), vec![ShutdownReason::ManualOverride]);
    assert_eq!(
        *alerts.lock().unwrap(),
        vec![(
            SafetyLevel::Emergency,
            "EMERGENCY SHUTDOWN: manual_override".to_string()
        )]
    );

    let state = monitor.snapshot_state();
    assert_eq!(state.shutdown_count, 1);
    assert_eq!(state.last_shutdown_reason, Some(ShutdownReason::ManualOverride));
}

// ---------------------------------------------------------------------------
// Test: a panicking shutdown callback cannot prevent the shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn panicking_callback_does_not_block_shutdown() {
    let (monitor, _, _) = build_monitor(fast_config());
    monitor.register_shutdown_callback(|_| panic!("relay driver crashed"));
    let shutdowns = record_shutdowns(&monitor);

    assert!(monitor.trigger_shutdown(ShutdownReason::ManualOverride));

    assert!(monitor.is_emergency());
    assert_eq!(*shutdowns.lock().unwrap(), vec![ShutdownReason::ManualOverride]);
}

// ---------------------------------------------------------------------------
// Test: a callback re-entering trigger_shutdown is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reentrant_trigger_from_callback_is_ignored() {
    let (monitor, _, _) = build_monitor(fast_config());
    let monitor = Arc::new(monitor);
    let nested = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&monitor);
    let sink = Arc::clone(&nested);
    monitor.register_shutdown_callback(move |_| {
        if let Some(monitor) = weak.upgrade() {
            sink.lock()
                .unwrap()
                .push(monitor.trigger_shutdown(ShutdownReason::SystemFailure));
        }
    });

    assert!(monitor.trigger_shutdown(ShutdownReason::ThermalRunaway));

    assert_eq!(*nested.lock().unwrap(), vec![false]);
    let state = monitor.snapshot_state();
    assert_eq!(state.shutdown_count, 1);
    assert_eq!(state.last_shutdown_reason, Some(ShutdownReason::ThermalRunaway));
}

// ---------------------------------------------------------------------------
// Test: a sensor fault escalates to SystemFailure and the loop survives
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sensor_fault_escalates_to_system_failure() {
    let (monitor, sensors, _) = build_monitor(fast_config());
    let shutdowns = record_shutdowns(&monitor);
    sensors.fail(Channel::Thermal, "thermistor open circuit");

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();

    assert!(wait_until(WAIT, || monitor.is_emergency()).await);
    assert_eq!(*shutdowns.lock().unwrap(), vec![ShutdownReason::SystemFailure]);

    sensors.clear_faults();
    let ticks = monitor.metrics().tick_count;
    assert!(wait_until(WAIT, || monitor.metrics().tick_count > ticks).await);

    monitor.stop().await;
}

// ---------------------------------------------------------------------------
// Test: a panicking sensor escalates to SystemFailure and the loop survives
// ---------------------------------------------------------------------------

struct ExplodingSensors;

impl SensorReader for ExplodingSensors {
    fn temperature(&self) -> Result<f64, SensorFault> {
        panic!("driver bug")
    }

    fn current(&self) -> Result<f64, SensorFault> {
        Ok(0.0)
    }

    fn neural_signal(&self) -> Result<f64, SensorFault> {
        Ok(0.0)
    }
}

#[tokio::test]
async fn panicking_sensor_escalates_to_system_failure() {
    let monitor = SafetyMonitor::builder(fast_config())
        .sensors(Arc::new(ExplodingSensors))
        .build();
    let shutdowns = record_shutdowns(&monitor);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();

    assert!(wait_until(WAIT, || monitor.is_emergency()).await);
    assert_eq!(*shutdowns.lock().unwrap(), vec![ShutdownReason::SystemFailure]);

    // The loop is still alive and honours stop.
    assert_eq!(monitor.stop().await, neuroacon_monitor::StopOutcome::Joined);
}

// ---------------------------------------------------------------------------
// Test: alerts and the shutdown are published on the event bus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_is_published_on_the_event_bus() {
    let (monitor, _, _) = build_monitor(fast_config());
    let mut rx = monitor.event_bus().subscribe();

    monitor.trigger_shutdown(ShutdownReason::PowerSurge);

    let alert = rx.try_recv().unwrap();
    assert_eq!(alert.event_type, EVENT_ALERT);
    assert_eq!(alert.level, SafetyLevel::Emergency);
    assert_eq!(alert.message, "EMERGENCY SHUTDOWN: power_surge");

    let shutdown = rx.try_recv().unwrap();
    assert_eq!(shutdown.event_type, EVENT_SHUTDOWN);
    assert_eq!(shutdown.payload["reason"], "power_surge");
}

// ---------------------------------------------------------------------------
// Test: the shutdown tick still runs the other channels' protective hooks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_tick_still_disconnects_neural_interface() {
    let (monitor, sensors, actuator) = build_monitor(fast_config());
    let shutdowns = record_shutdowns(&monitor);
    sensors.set_temperature(65.0);
    sensors.set_neural_signal(650.0);

    monitor.initialize().unwrap();
    monitor.start().await.unwrap();
    assert!(wait_until(WAIT, || monitor.metrics().tick_count >= 3).await);
    monitor.stop().await;

    assert_eq!(*shutdowns.lock().unwrap(), vec![ShutdownReason::ThermalRunaway]);
    // Fired once, on the shutdown tick; later ticks are frozen.
    assert_eq!(actuator.taken(), vec![Action::DisconnectNeural(650.0)]);
}
