//! Prelude module for common re-exports.
//!
//! ```rust
//! use robo_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_TICK_PERIOD_US, MAX_ACTIVE_TASKS, MAX_RESOURCES};

/// Default tick period as Duration.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_micros(DEFAULT_TICK_PERIOD_US);
