//! The safety monitor: lifecycle, monitoring loop and shutdown trigger.
//!
//! A single background task samples the sensors on a fixed interval,
//! evaluates the readings against the validated threshold tables and
//! dispatches alerts, protective actions and the emergency shutdown. All
//! long-lived state sits behind one mutex and is only ever handed out as a
//! copy.
//!
//! Lifecycle: `Uninitialized → Initialized → Running → Stopped`. A stopped
//! monitor may be started again; the emergency flag survives restarts.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use neuroacon_core::error::panic_message;
use neuroacon_core::hardware::{aggregate_level, ChannelVerdict, Readings, ThresholdTables};
use neuroacon_core::restrictions::{
    AuthorizationDecision, ProcessRestriction, RestrictionList, ViolationRecord,
};
use neuroacon_core::state::{ReadingHistory, SafetyState};
use neuroacon_core::{ConfigurationError, LifecycleError, SafetyLevel, SensorFault, ShutdownReason};
use neuroacon_events::{EventBus, SafetyEvent};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::actuators::{self, Actuator, LoggingActuator};
use crate::callbacks::CallbackRegistry;
use crate::config::MonitorConfig;
use crate::metrics::SafetyMetrics;
use crate::sensors::{self, InjectableSensors, SensorReader};

// ---------------------------------------------------------------------------
// Public lifecycle types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

/// How a call to [`SafetyMonitor::stop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The monitor was not running; nothing to do.
    NotRunning,
    /// The loop observed the stop signal and exited.
    Joined,
    /// The loop did not exit within the stop timeout and was left detached.
    /// It still exits on its own once its current tick completes.
    TimedOut,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything guarded by the monitor's single state lock.
struct MonitorData {
    state: SafetyState,
    temperature: ReadingHistory,
    current: ReadingHistory,
    neural: ReadingHistory,
    violations: Vec<ViolationRecord>,
    tick_count: u64,
}

impl MonitorData {
    fn new(config: &MonitorConfig) -> Self {
        let history = || ReadingHistory::new(config.history_capacity, config.history_trim_to);
        Self {
            state: SafetyState::default(),
            temperature: history(),
            current: history(),
            neural: history(),
            violations: Vec::new(),
            tick_count: 0,
        }
    }

    fn record(&mut self, readings: &Readings) {
        self.state.record_readings(readings);
        self.temperature.push(readings.temperature_c);
        self.current.push(readings.current_ma);
        self.neural.push(readings.neural_uv);
    }
}

/// State shared between the monitor handle and its loop task.
struct Shared {
    data: Mutex<MonitorData>,
    callbacks: CallbackRegistry,
    restrictions: RwLock<RestrictionList>,
    sensors: Arc<dyn SensorReader>,
    actuator: Arc<dyn Actuator>,
    events: Arc<EventBus>,
}

impl Shared {
    /// Lock the state, recovering from poisoning: a panic elsewhere must
    /// never disable the safety path.
    fn lock_data(&self) -> MutexGuard<'_, MonitorData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_emergency(&self) -> bool {
        self.lock_data().state.is_emergency
    }

    /// Run one tick, converting any fault or panic into a `SystemFailure`
    /// shutdown. Never propagates.
    fn run_tick(&self, tables: &ThresholdTables) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.tick(tables)))
            .unwrap_or_else(|payload| Err(SensorFault::Panicked(panic_message(payload.as_ref()))));

        if let Err(fault) = outcome {
            tracing::error!(error = %fault, "Error in monitoring loop");
            self.trigger_shutdown(ShutdownReason::SystemFailure);
        }
    }

    fn tick(&self, tables: &ThresholdTables) -> Result<(), SensorFault> {
        let readings = sensors::sample(self.sensors.as_ref())?;
        let verdicts = tables.evaluate(&readings);

        // An emergency entered on an earlier tick freezes dispatch; readings
        // stay live. Within this tick every channel is still handled.
        let frozen = {
            let mut data = self.lock_data();
            data.record(&readings);
            data.state.is_emergency
        };

        if !frozen {
            for verdict in &verdicts {
                self.respond(verdict);
            }
        }

        let mut data = self.lock_data();
        data.state.safety_level = aggregate_level(&verdicts, data.state.is_emergency);
        data.tick_count += 1;
        Ok(())
    }

    fn respond(&self, verdict: &ChannelVerdict) {
        if let Some(reason) = verdict.shutdown {
            tracing::error!(
                channel = %verdict.channel,
                value = verdict.value,
                "EMERGENCY: {} reading exceeds emergency threshold",
                verdict.channel,
            );
            self.trigger_shutdown(reason);
            return;
        }

        if let Some(message) = &verdict.alert {
            match (verdict.level, verdict.action) {
                (SafetyLevel::Critical, _) => {
                    tracing::error!(channel = %verdict.channel, value = verdict.value, "CRITICAL: {message}")
                }
                (_, Some(_)) => {
                    tracing::warn!(channel = %verdict.channel, value = verdict.value, "WARNING: {message}")
                }
                _ => tracing::info!(channel = %verdict.channel, value = verdict.value, "{message}"),
            }
            self.send_alert(verdict.level, message);
        }

        actuators::apply(self.actuator.as_ref(), verdict);
    }

    fn send_alert(&self, level: SafetyLevel, message: &str) {
        self.callbacks.dispatch_alert(level, message);
        self.events.publish(SafetyEvent::alert(level, message));
    }

    fn trigger_shutdown(&self, reason: ShutdownReason) -> bool {
        // State flips to emergency before any subscriber runs, so re-entrant
        // calls from callbacks take the no-op path.
        let entered = self.lock_data().state.enter_emergency(reason, Utc::now());
        if !entered {
            tracing::debug!(reason = %reason, "Emergency shutdown already in effect");
            return false;
        }

        tracing::error!(reason = %reason, "EMERGENCY SHUTDOWN TRIGGERED");

        let faults = self.callbacks.dispatch_shutdown(reason);
        self.send_alert(SafetyLevel::Emergency, &format!("EMERGENCY SHUTDOWN: {reason}"));
        self.events.publish(SafetyEvent::shutdown(reason));

        tracing::error!(
            reason = %reason,
            callback_faults = faults.len(),
            "Emergency shutdown complete"
        );
        true
    }
}

/// The periodic monitoring task. Exits when `cancel` fires; a tick in
/// progress always runs to completion first.
async fn run_loop(
    shared: Arc<Shared>,
    tables: ThresholdTables,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "Safety monitoring loop started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Safety monitoring loop stopping");
                break;
            }
            _ = ticker.tick() => shared.run_tick(&tables),
        }
    }
}

// ---------------------------------------------------------------------------
// SafetyMonitor
// ---------------------------------------------------------------------------

struct Lifecycle {
    phase: MonitorPhase,
    tables: Option<ThresholdTables>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

/// Fail-safe threshold escalation and emergency-shutdown monitor.
///
/// # Usage
///
/// ```rust,no_run
/// use neuroacon_monitor::{MonitorConfig, SafetyMonitor};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let monitor = SafetyMonitor::new(MonitorConfig::default());
/// monitor.register_shutdown_callback(|reason| eprintln!("shutdown: {reason}"));
/// monitor.initialize()?;
/// monitor.start().await?;
/// // ...
/// monitor.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct SafetyMonitor {
    config: MonitorConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

/// Builder for a [`SafetyMonitor`] with custom sensors, actuator, event bus
/// or restriction list.
pub struct SafetyMonitorBuilder {
    config: MonitorConfig,
    sensors: Option<Arc<dyn SensorReader>>,
    actuator: Option<Arc<dyn Actuator>>,
    events: Option<Arc<EventBus>>,
    restrictions: Option<RestrictionList>,
}

impl SafetyMonitorBuilder {
    pub fn sensors(mut self, sensors: Arc<dyn SensorReader>) -> Self {
        self.sensors = Some(sensors);
        self
    }

    pub fn actuator(mut self, actuator: Arc<dyn Actuator>) -> Self {
        self.actuator = Some(actuator);
        self
    }

    pub fn event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Start from this list instead of the built-in defaults.
    pub fn restrictions(mut self, restrictions: RestrictionList) -> Self {
        self.restrictions = Some(restrictions);
        self
    }

    pub fn build(self) -> SafetyMonitor {
        let shared = Shared {
            data: Mutex::new(MonitorData::new(&self.config)),
            callbacks: CallbackRegistry::new(),
            restrictions: RwLock::new(self.restrictions.unwrap_or_else(RestrictionList::with_defaults)),
            sensors: self
                .sensors
                .unwrap_or_else(|| Arc::new(InjectableSensors::new()) as Arc<dyn SensorReader>),
            actuator: self
                .actuator
                .unwrap_or_else(|| Arc::new(LoggingActuator) as Arc<dyn Actuator>),
            events: self.events.unwrap_or_default(),
        };

        let thermal = &self.config.thermal;
        tracing::info!(
            warning = thermal.warning_threshold,
            throttle = thermal.throttling_threshold,
            critical = thermal.critical_threshold,
            emergency = thermal.emergency_threshold,
            interval_ms = self.config.interval.as_millis() as u64,
            "SafetyMonitor created"
        );

        SafetyMonitor {
            config: self.config,
            shared: Arc::new(shared),
            lifecycle: Mutex::new(Lifecycle {
                phase: MonitorPhase::Uninitialized,
                tables: None,
                cancel: None,
                handle: None,
            }),
        }
    }
}

impl SafetyMonitor {
    /// A monitor with placeholder sensors (all zero), a logging actuator and
    /// the default restriction list.
    pub fn new(config: MonitorConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: MonitorConfig) -> SafetyMonitorBuilder {
        SafetyMonitorBuilder {
            config,
            sensors: None,
            actuator: None,
            events: None,
            restrictions: None,
        }
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Validate the configuration and freeze the threshold tables.
    ///
    /// A no-op while running.
    pub fn initialize(&self) -> Result<(), ConfigurationError> {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.phase == MonitorPhase::Running {
            tracing::warn!("SafetyMonitor is running; initialize ignored");
            return Ok(());
        }

        tracing::info!("Initializing SafetyMonitor...");
        let tables = self.config.validate()?;
        lifecycle.tables = Some(tables);
        lifecycle.phase = MonitorPhase::Initialized;
        tracing::info!("SafetyMonitor initialized successfully");
        Ok(())
    }

    /// Spawn the monitoring loop on the current tokio runtime.
    ///
    /// Starting an already running monitor logs a warning and returns `Ok`.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let mut lifecycle = self.lock_lifecycle();
        match lifecycle.phase {
            MonitorPhase::Uninitialized => return Err(LifecycleError::NotInitialized),
            MonitorPhase::Running => {
                tracing::warn!("SafetyMonitor is already running");
                return Ok(());
            }
            MonitorPhase::Initialized | MonitorPhase::Stopped => {}
        }

        let tables = lifecycle.tables.ok_or(LifecycleError::NotInitialized)?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;

        tracing::info!("Starting SafetyMonitor...");
        self.shared.lock_data().state.is_active = true;

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(
            run_loop(
                Arc::clone(&self.shared),
                tables,
                self.config.interval,
                cancel.clone(),
            )
            .instrument(tracing::info_span!("safety_monitor")),
        );

        lifecycle.phase = MonitorPhase::Running;
        lifecycle.cancel = Some(cancel);
        lifecycle.handle = Some(handle);
        tracing::info!("SafetyMonitor started - monitoring active");
        Ok(())
    }

    /// Signal the loop to stop and wait, at most `stop_timeout`, for it to
    /// exit. A timeout is reported, not escalated.
    pub async fn stop(&self) -> StopOutcome {
        let (cancel, handle) = {
            let mut lifecycle = self.lock_lifecycle();
            if lifecycle.phase != MonitorPhase::Running {
                tracing::debug!(phase = ?lifecycle.phase, "SafetyMonitor is not running");
                return StopOutcome::NotRunning;
            }
            lifecycle.phase = MonitorPhase::Stopped;
            (lifecycle.cancel.take(), lifecycle.handle.take())
        };

        tracing::info!("Stopping SafetyMonitor...");
        self.shared.lock_data().state.is_active = false;
        if let Some(cancel) = cancel {
            cancel.cancel();
        }

        let Some(handle) = handle else {
            return StopOutcome::Joined;
        };

        match tokio::time::timeout(self.config.stop_timeout, handle).await {
            Ok(Ok(())) => {
                tracing::info!("SafetyMonitor stopped");
                StopOutcome::Joined
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Safety monitoring loop terminated abnormally");
                StopOutcome::Joined
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.stop_timeout.as_millis() as u64,
                    "Safety monitoring loop did not exit within the stop timeout"
                );
                StopOutcome::TimedOut
            }
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.lock_lifecycle().phase
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // -- Shutdown -----------------------------------------------------------

    /// Enter the emergency state.
    ///
    /// Idempotent: returns `true` only for the call that performed the
    /// shutdown; every later call is a no-op returning `false`.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) -> bool {
        self.shared.trigger_shutdown(reason)
    }

    pub fn is_emergency(&self) -> bool {
        self.shared.is_emergency()
    }

    // -- Callbacks ----------------------------------------------------------

    /// Subscribe to emergency shutdowns. Invoked on the monitoring loop;
    /// must not block.
    pub fn register_shutdown_callback<F>(&self, callback: F)
    where
        F: Fn(ShutdownReason) + Send + Sync + 'static,
    {
        self.shared.callbacks.register_shutdown(callback);
    }

    /// Subscribe to safety alerts. Invoked on the monitoring loop; must not
    /// block.
    pub fn register_alert_callback<F>(&self, callback: F)
    where
        F: Fn(SafetyLevel, &str) + Send + Sync + 'static,
    {
        self.shared.callbacks.register_alert(callback);
    }

    /// The bus every alert, shutdown and process violation is published on.
    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.shared.events)
    }

    // -- Process authorization ---------------------------------------------

    /// Whether `process_name` may run. Matches count as violations even
    /// when the process is allowed.
    pub fn authorize(&self, process_name: &str) -> bool {
        self.check_process(process_name).is_authorized()
    }

    /// Like [`authorize`](Self::authorize) but returns the full decision.
    pub fn check_process(&self, process_name: &str) -> AuthorizationDecision {
        let decision = self
            .shared
            .restrictions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .decide(process_name);

        let record = match decision.restriction() {
            Some(restriction) => ViolationRecord::new(process_name, restriction, Utc::now()),
            None => return decision,
        };

        {
            let mut data = self.shared.lock_data();
            data.state.total_violations += 1;
            data.violations.push(record.clone());
        }

        match &decision {
            AuthorizationDecision::Blocked(r) => tracing::error!(
                process = process_name,
                risk = %r.risk_level,
                "UNAUTHORIZED PROCESS BLOCKED"
            ),
            AuthorizationDecision::PendingAuthorization(r) => tracing::warn!(
                process = process_name,
                restriction = %r.name,
                "Process requires explicit authorization"
            ),
            AuthorizationDecision::AuthorizedWithSafeguards(r) => tracing::info!(
                process = process_name,
                restriction = %r.name,
                "Process allowed with safeguards"
            ),
            AuthorizationDecision::Authorized => {}
        }

        self.shared
            .events
            .publish(SafetyEvent::process_violation(&record, decision.is_authorized()));
        decision
    }

    /// Append a restriction; it is checked after all existing ones.
    pub fn add_restriction(&self, restriction: ProcessRestriction) -> Result<(), ConfigurationError> {
        let name = restriction.name.clone();
        self.shared
            .restrictions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(restriction)?;
        tracing::info!(restriction = %name, "Added process restriction");
        Ok(())
    }

    pub fn restrictions(&self) -> Vec<ProcessRestriction> {
        self.shared
            .restrictions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    // -- Read-only views ----------------------------------------------------

    /// Copy of the current safety state.
    pub fn snapshot_state(&self) -> SafetyState {
        self.shared.lock_data().state.clone()
    }

    /// Copy of the process violation log, oldest first.
    pub fn violation_log(&self) -> Vec<ViolationRecord> {
        self.shared.lock_data().violations.clone()
    }

    pub fn metrics(&self) -> SafetyMetrics {
        let data = self.shared.lock_data();
        let state = &data.state;
        SafetyMetrics {
            is_active: state.is_active,
            is_emergency: state.is_emergency,
            safety_level: state.safety_level,
            current_temperature: state.current_temperature,
            current_current_ma: state.current_current_ma,
            neural_activity_uv: state.neural_activity_uv,
            shutdown_count: state.shutdown_count,
            total_violations: state.total_violations,
            last_shutdown: state.last_shutdown,
            last_shutdown_reason: state.last_shutdown_reason,
            thermal_history_avg: data.temperature.average(),
            current_history_avg: data.current.average(),
            neural_history_avg: data.neural.average(),
            process_violations_count: data.violations.len(),
            tick_count: data.tick_count,
        }
    }
}

impl Drop for SafetyMonitor {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(cancel) = lifecycle.cancel.take() {
            cancel.cancel();
        }
    }
}
