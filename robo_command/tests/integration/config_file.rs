//! Robot configuration loaded from disk.

use std::io::Write;
use std::path::Path;

use robo_command::config::{load_config, ScriptTask};
use robo_common::config::ConfigError;
use tempfile::NamedTempFile;

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{body}").unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn load_from_file() {
    let file = write_config(
        r#"[shared]
log_level = "debug"
service_name = "robot-07"

[scheduler]
tick_period_us = 5000
max_ticks = 50

[[script]]
at_tick = 3
task = "drive_for_time"
power = 0.25
duration_s = 0.1
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.shared.service_name, "robot-07");
    assert_eq!(config.scheduler.tick_period_us, 5000);
    assert_eq!(config.scheduler.max_ticks, Some(50));
    assert_eq!(config.drive.resource_name, "drive");
    assert_eq!(config.script.len(), 1);
    assert_eq!(config.script[0].task, ScriptTask::DriveForTime);
}

#[test]
fn file_failing_validation_is_rejected() {
    let file = write_config(
        r#"[shared]
service_name = "robot"

[[script]]
at_tick = 20
task = "drive_for_distance"
power = 0.5
distance = 10.0

[[script]]
at_tick = 5
task = "drive_for_distance"
power = 0.5
distance = 10.0
"#,
    );

    let result = load_config(file.path());
    assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("sorted")));
}

#[test]
fn missing_file_is_not_found() {
    let result = load_config(Path::new("/nonexistent/robot.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

#[test]
fn shipped_sample_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/robot.toml");
    let config = load_config(&path).unwrap();
    assert_eq!(config.script.len(), 2);
    assert_eq!(config.script[0].task, ScriptTask::DriveForDistance);
}
