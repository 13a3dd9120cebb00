//! Robot configuration: scheduler timing, drive simulation, task script.
//!
//! ```toml
//! [shared]
//! service_name = "robot"
//!
//! [scheduler]
//! tick_period_us = 10000
//!
//! [drive]
//! counts_per_tick = 12.5
//!
//! [[script]]
//! at_tick = 50
//! task = "drive_for_distance"
//! power = 0.6
//! distance = 400.0
//! ```

use std::path::Path;
use std::time::Duration;

use robo_common::consts::{MAX_TICK_PERIOD_US, MIN_TICK_PERIOD_US};
use robo_common::prelude::*;
use serde::Deserialize;

// ─── Config Types ───────────────────────────────────────────────────

/// Complete robot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub script: Vec<ScriptEntry>,
}

/// Cycle driver settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Tick period [µs].
    pub tick_period_us: u64,
    /// Stop the cycle loop on the first task fault.
    pub stop_on_fault: bool,
    /// Stop after this many ticks (`None` = run until signalled).
    pub max_ticks: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_us: DEFAULT_TICK_PERIOD_US,
            stop_on_fault: false,
            max_ticks: None,
        }
    }
}

impl SchedulerConfig {
    #[inline]
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us)
    }
}

/// Drive resource and simulated drive train.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Name the drive resource is registered under.
    pub resource_name: String,
    /// Encoder counts per tick at full power.
    pub counts_per_tick: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            resource_name: "drive".to_string(),
            counts_per_tick: 10.0,
        }
    }
}

/// Scripted task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptTask {
    DriveForDistance,
    DriveForTime,
}

/// One scheduled step of the task script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptEntry {
    /// Tick count at which the task is scheduled (before that tick runs).
    pub at_tick: u64,
    pub task: ScriptTask,
    /// Motor power in [-1, 1].
    pub power: f64,
    /// Encoder counts, `drive_for_distance` only.
    #[serde(default)]
    pub distance: Option<f64>,
    /// Seconds, `drive_for_time` only.
    #[serde(default)]
    pub duration_s: Option<f64>,
}

// ─── Loading ────────────────────────────────────────────────────────

/// Load and validate a robot configuration file.
pub fn load_config(path: &Path) -> Result<RobotConfig, ConfigError> {
    let config = RobotConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Parse and validate an in-memory robot configuration.
pub fn load_config_from_str(content: &str) -> Result<RobotConfig, ConfigError> {
    let config = RobotConfig::from_toml(content)?;
    config.validate()?;
    Ok(config)
}

// ─── Validation ─────────────────────────────────────────────────────

impl RobotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.scheduler.validate()?;
        self.drive.validate()?;
        validate_script(&self.script)
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TICK_PERIOD_US..=MAX_TICK_PERIOD_US).contains(&self.tick_period_us) {
            return Err(ConfigError::ValidationError(format!(
                "tick_period_us {} outside [{MIN_TICK_PERIOD_US}, {MAX_TICK_PERIOD_US}]",
                self.tick_period_us
            )));
        }
        Ok(())
    }
}

impl DriveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resource_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "drive.resource_name cannot be empty".to_string(),
            ));
        }
        non_negative("drive.counts_per_tick", self.counts_per_tick)
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be finite and non-negative, got {value}"
        )));
    }
    Ok(())
}

fn validate_script(script: &[ScriptEntry]) -> Result<(), ConfigError> {
    if script.windows(2).any(|w| w[0].at_tick > w[1].at_tick) {
        return Err(ConfigError::ValidationError(
            "script entries must be sorted by at_tick".to_string(),
        ));
    }

    for (i, entry) in script.iter().enumerate() {
        if !(-1.0..=1.0).contains(&entry.power) {
            return Err(ConfigError::ValidationError(format!(
                "script[{i}].power {} outside [-1, 1]",
                entry.power
            )));
        }
        let (name, param) = match entry.task {
            ScriptTask::DriveForDistance => ("distance", entry.distance),
            ScriptTask::DriveForTime => ("duration_s", entry.duration_s),
        };
        let value = param.ok_or_else(|| {
            ConfigError::ValidationError(format!("script[{i}] is missing '{name}'"))
        })?;
        non_negative(&format!("script[{i}].{name}"), value)?;
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────
