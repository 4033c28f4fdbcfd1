use std::str::FromStr;
use std::time::Duration;

use neuroacon_core::hardware::{NeuralThresholds, PowerThresholds, ThermalThresholds, ThresholdTables};
use neuroacon_core::state::{DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_TRIM_TO, MAX_HISTORY_CAPACITY};
use neuroacon_core::ConfigurationError;

/// Default polling interval (10 Hz).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Default bound on how long `stop()` waits for the loop to exit.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default period of the daemon's metrics report.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Safety monitor configuration.
///
/// Thresholds are plain data here; they are validated (and frozen into a
/// [`ThresholdTables`]) by [`MonitorConfig::validate`], which
/// `SafetyMonitor::initialize` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Time between monitoring ticks.
    pub interval: Duration,
    /// Bounded wait for the loop to exit on `stop()`.
    pub stop_timeout: Duration,
    /// Maximum readings kept per channel history.
    pub history_capacity: usize,
    /// Length a history is cut back to on overflow.
    pub history_trim_to: usize,
    pub thermal: ThermalThresholds,
    pub power: PowerThresholds,
    pub neural: NeuralThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            history_trim_to: DEFAULT_HISTORY_TRIM_TO,
            thermal: ThermalThresholds::default(),
            power: PowerThresholds::default(),
            neural: NeuralThresholds::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `SAFETY_INTERVAL_MS`      | `100`   |
    /// | `SAFETY_STOP_TIMEOUT_MS`  | `2000`  |
    /// | `SAFETY_HISTORY_CAPACITY` | `1000`  |
    /// | `SAFETY_HISTORY_TRIM_TO`  | `500`   |
    /// | `THERMAL_WARNING_C`       | `45`    |
    /// | `THERMAL_THROTTLING_C`    | `50`    |
    /// | `THERMAL_CRITICAL_C`      | `55`    |
    /// | `THERMAL_EMERGENCY_C`     | `60`    |
    /// | `THERMAL_MAX_ALLOWED_C`   | `60`    |
    /// | `POWER_NORMAL_MA`         | `100`   |
    /// | `POWER_WARNING_MA`        | `500`   |
    /// | `POWER_CRITICAL_MA`       | `1000`  |
    /// | `POWER_MAX_MA`            | `2000`  |
    /// | `POWER_LIMIT_MA`          | `1500`  |
    /// | `NEURAL_NORMAL_UV`        | `100`   |
    /// | `NEURAL_SEIZURE_UV`       | `500`   |
    /// | `NEURAL_CRITICAL_UV`      | `1000`  |
    /// | `NEURAL_SAMPLING_RATE_HZ` | `256`   |
    ///
    /// A variable that is set but does not parse is an error, never a
    /// silent fallback to the default.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let get = |key: &str, default: f64| setting(&lookup, key, default);

        let interval_ms = setting(&lookup, "SAFETY_INTERVAL_MS", d.interval.as_millis() as u64)?;
        let stop_timeout_ms =
            setting(&lookup, "SAFETY_STOP_TIMEOUT_MS", d.stop_timeout.as_millis() as u64)?;

        Ok(Self {
            interval: Duration::from_millis(interval_ms),
            stop_timeout: Duration::from_millis(stop_timeout_ms),
            history_capacity: setting(&lookup, "SAFETY_HISTORY_CAPACITY", d.history_capacity)?,
            history_trim_to: setting(&lookup, "SAFETY_HISTORY_TRIM_TO", d.history_trim_to)?,
            thermal: ThermalThresholds {
                warning_threshold: get("THERMAL_WARNING_C", d.thermal.warning_threshold)?,
                throttling_threshold: get("THERMAL_THROTTLING_C", d.thermal.throttling_threshold)?,
                critical_threshold: get("THERMAL_CRITICAL_C", d.thermal.critical_threshold)?,
                emergency_threshold: get("THERMAL_EMERGENCY_C", d.thermal.emergency_threshold)?,
                max_allowed: get("THERMAL_MAX_ALLOWED_C", d.thermal.max_allowed)?,
            },
            power: PowerThresholds {
                normal_current_ma: get("POWER_NORMAL_MA", d.power.normal_current_ma)?,
                warning_current_ma: get("POWER_WARNING_MA", d.power.warning_current_ma)?,
                critical_current_ma: get("POWER_CRITICAL_MA", d.power.critical_current_ma)?,
                max_current_ma: get("POWER_MAX_MA", d.power.max_current_ma)?,
                current_limit_ma: get("POWER_LIMIT_MA", d.power.current_limit_ma)?,
            },
            neural: NeuralThresholds {
                normal_eeg_uv: get("NEURAL_NORMAL_UV", d.neural.normal_eeg_uv)?,
                seizure_threshold_uv: get("NEURAL_SEIZURE_UV", d.neural.seizure_threshold_uv)?,
                critical_threshold_uv: get("NEURAL_CRITICAL_UV", d.neural.critical_threshold_uv)?,
                sampling_rate_hz: setting(
                    &lookup,
                    "NEURAL_SAMPLING_RATE_HZ",
                    d.neural.sampling_rate_hz,
                )?,
            },
        })
    }

    /// Check loop settings and validate the threshold tables.
    pub fn validate(&self) -> Result<ThresholdTables, ConfigurationError> {
        if self.interval.is_zero() {
            return Err(invalid("interval", "must be greater than zero"));
        }
        if self.stop_timeout.is_zero() {
            return Err(invalid("stop_timeout", "must be greater than zero"));
        }
        if self.history_capacity == 0 || self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(invalid(
                "history_capacity",
                format!("must be between 1 and {MAX_HISTORY_CAPACITY}"),
            ));
        }
        if self.history_trim_to == 0 || self.history_trim_to > self.history_capacity {
            return Err(invalid(
                "history_trim_to",
                format!("must be between 1 and history_capacity ({})", self.history_capacity),
            ));
        }

        let tables = ThresholdTables::new(self.thermal, self.power, self.neural)?;
        tracing::info!(
            warning = self.thermal.warning_threshold,
            throttle = self.thermal.throttling_threshold,
            critical = self.thermal.critical_threshold,
            emergency = self.thermal.emergency_threshold,
            "All safety thresholds validated"
        );
        Ok(tables)
    }
}

/// Period of the daemon's metrics report, from `SAFETY_REPORT_INTERVAL_SECS`.
pub fn report_interval_from_env() -> Result<Duration, ConfigurationError> {
    report_interval_from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`report_interval_from_env`] with an explicit variable source.
pub fn report_interval_from_lookup<F>(lookup: F) -> Result<Duration, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    const KEY: &str = "SAFETY_REPORT_INTERVAL_SECS";
    let secs = setting(&lookup, KEY, DEFAULT_REPORT_INTERVAL.as_secs())?;
    if secs == 0 {
        return Err(invalid(KEY, "must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

fn setting<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, format!("{raw:?} ({e})"))),
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidSetting {
        key: key.to_string(),
        reason: reason.into(),
    }
}
