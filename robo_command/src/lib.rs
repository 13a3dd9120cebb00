//! # Robo Command
//!
//! Cooperative, single-threaded task scheduler for tick-driven robot control.
//!
//! Tasks declare the resources (physical subsystems) they need. Scheduling a
//! task interrupts every task holding one of those resources, and each
//! resource may name a default task that takes over whenever it goes idle.
//! A fixed-period cycle driver calls [`scheduler::Scheduler::tick`].
//!
//! ## Modules
//!
//! - [`resource`] - resource ids, bitmask sets, ownership tokens
//! - [`task`] - `Task` trait and per-activation lifecycle
//! - [`scheduler`] - preemption, default re-arming, the tick
//! - [`drive`] / [`input`] - drive-train and joystick collaborators
//! - [`tasks`] - concrete drive tasks
//! - [`config`] - robot configuration (TOML)
//! - [`cycle`] - fixed-period cycle runner and RT setup

pub mod config;
pub mod cycle;
pub mod drive;
pub mod error;
pub mod input;
pub mod resource;
pub mod scheduler;
pub mod task;
pub mod tasks;

pub use error::{SchedulerError, TaskError};
pub use resource::{Resource, ResourceId, ResourceSet};
pub use scheduler::Scheduler;
pub use task::{Task, TaskExit, TaskId, TaskState};
