//! Concrete drive tasks.
//!
//! All of them require the drive resource only. `ArcadeDrive` is meant to be
//! installed as the drive's default task; the others are scripted.

mod arcade;
mod drive_distance;
mod drive_time;

pub use arcade::ArcadeDrive;
pub use drive_distance::DriveForDistance;
pub use drive_time::DriveForTime;

use std::time::Duration;

use robo_common::config::ConfigError;

use crate::config::{ScriptEntry, ScriptTask};
use crate::drive::SharedDrive;
use crate::resource::ResourceId;
use crate::task::Task;

/// Build the task described by a script entry.
///
/// # Errors
/// `ValidationError` if the parameter of the task kind is missing or not a
/// finite non-negative number.
pub fn build_script_task(
    entry: &ScriptEntry,
    drive: &SharedDrive,
    drive_resource: ResourceId,
    tick_period: Duration,
) -> Result<Box<dyn Task>, ConfigError> {
    let task: Box<dyn Task> = match entry.task {
        ScriptTask::DriveForDistance => {
            let distance = required(entry.distance, "distance")?;
            Box::new(DriveForDistance::new(
                drive.clone(),
                drive_resource,
                entry.power,
                distance,
            ))
        }
        ScriptTask::DriveForTime => {
            let seconds = required(entry.duration_s, "duration_s")?;
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|e| ConfigError::ValidationError(format!("duration_s: {e}")))?;
            Box::new(DriveForTime::new(
                drive.clone(),
                drive_resource,
                entry.power,
                duration,
                tick_period,
            ))
        }
    };
    Ok(task)
}

fn required(value: Option<f64>, name: &str) -> Result<f64, ConfigError> {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(v) => Err(ConfigError::ValidationError(format!(
            "{name} must be finite and non-negative, got {v}"
        ))),
        None => Err(ConfigError::ValidationError(format!("missing '{name}'"))),
    }
}
