//! `neuroacon-monitord` -- standalone safety monitor daemon.
//!
//! Loads thresholds from the environment, runs the monitoring loop until
//! Ctrl-C and logs every alert, shutdown and periodic metrics report.
//! Without attached hardware the sensors read zero.
//!
//! # Environment variables
//!
//! | Variable                      | Default | Description                          |
//! |-------------------------------|---------|--------------------------------------|
//! | `SAFETY_INTERVAL_MS`          | `100`   | Milliseconds between sensor polls    |
//! | `SAFETY_STOP_TIMEOUT_MS`      | `2000`  | Bound on waiting for the loop to exit |
//! | `SAFETY_REPORT_INTERVAL_SECS` | `10`    | Seconds between metrics reports      |
//! | `THERMAL_*`, `POWER_*`, `NEURAL_*` | see `MonitorConfig::from_env` | Threshold tables |

use neuroacon_core::SafetyLevel;
use neuroacon_events::SafetyEvent;
use neuroacon_monitor::{config, MonitorConfig, SafetyMonitor};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neuroacon_monitor=info,neuroacon_monitord=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid safety configuration");
        std::process::exit(1);
    });

    let report_interval = config::report_interval_from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid report interval");
        std::process::exit(1);
    });

    let monitor = SafetyMonitor::new(config);

    monitor.register_shutdown_callback(|reason| {
        tracing::error!(reason = %reason, "Shutdown callback: cutting power to attached hardware");
    });
    monitor.register_alert_callback(|level, message| match level {
        SafetyLevel::Emergency | SafetyLevel::Critical => {
            tracing::error!(level = %level, "Safety alert: {message}")
        }
        SafetyLevel::Warning => tracing::warn!(level = %level, "Safety alert: {message}"),
        SafetyLevel::Normal => tracing::info!(level = %level, "Safety alert: {message}"),
    });

    if let Err(e) = monitor.initialize() {
        tracing::error!(error = %e, "Safety monitor initialization failed");
        std::process::exit(1);
    }
    if let Err(e) = monitor.start().await {
        tracing::error!(error = %e, "Safety monitor failed to start");
        std::process::exit(1);
    }

    tokio::spawn(log_events(monitor.event_bus().subscribe()));

    let mut report = tokio::time::interval(report_interval);
    report.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, stopping safety monitor");
                break;
            }
            _ = report.tick() => {
                let metrics = monitor.metrics();
                tracing::info!(
                    level = %metrics.safety_level,
                    emergency = metrics.is_emergency,
                    temperature_c = metrics.current_temperature,
                    current_ma = metrics.current_current_ma,
                    neural_uv = metrics.neural_activity_uv,
                    violations = metrics.total_violations,
                    ticks = metrics.tick_count,
                    "Safety report"
                );
            }
        }
    }

    let outcome = monitor.stop().await;
    tracing::info!(outcome = ?outcome, "neuroacon-monitord exiting");
}

/// Log every event published on the bus until it closes.
async fn log_events(mut rx: tokio::sync::broadcast::Receiver<SafetyEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => tracing::debug!(
                event_type = %event.event_type,
                level = %event.level,
                "{}",
                event.message
            ),
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Event logger lagged behind the bus")
            }
            Err(RecvError::Closed) => break,
        }
    }
}
