//! System-wide constants for the robo_command workspace.
//!
//! Single source of truth for scheduler capacity limits and timing defaults.

use static_assertions::const_assert;

/// Maximum number of resources a single scheduler can register.
///
/// Resource sets are `u64` bitmasks, so this can never exceed 64.
pub const MAX_RESOURCES: usize = 64;

/// Maximum number of simultaneously active tasks.
pub const MAX_ACTIVE_TASKS: usize = 32;

/// Default control-loop tick period in microseconds (100 Hz).
pub const DEFAULT_TICK_PERIOD_US: u64 = 10_000;

/// Shortest tick period accepted from configuration [µs].
pub const MIN_TICK_PERIOD_US: u64 = 1_000;

/// Longest tick period accepted from configuration [µs].
pub const MAX_TICK_PERIOD_US: u64 = 1_000_000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/robot.toml";

const_assert!(MAX_RESOURCES <= 64);
const_assert!(MAX_ACTIVE_TASKS > 0);
const_assert!(MIN_TICK_PERIOD_US <= DEFAULT_TICK_PERIOD_US);
const_assert!(DEFAULT_TICK_PERIOD_US <= MAX_TICK_PERIOD_US);
