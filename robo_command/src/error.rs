//! Error types for scheduling and task execution.
//!
//! `SchedulerError` covers caller mistakes (reported before any side effect)
//! and task faults (reported after the faulty task has been cleaned up).
//! `TaskError` is what a task returns from `execute()`/`is_finished()`.

use thiserror::Error;

use crate::resource::ResourceId;
use crate::task::TaskId;

/// Fault raised by a task callback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// A sensor could not be read.
    #[error("sensor read failed: {0}")]
    Sensor(String),

    /// An actuator rejected a command.
    #[error("actuator command failed: {0}")]
    Actuator(String),

    /// Any other task-specific fault.
    #[error("{0}")]
    Other(String),
}

/// Scheduler operation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// Task handle was not issued by this scheduler.
    #[error("task {0} is not registered")]
    UnknownTask(TaskId),

    /// Task requires a resource that was never registered.
    #[error("resource {0} is not registered")]
    UnknownResource(ResourceId),

    /// A resource with this name already exists.
    #[error("resource '{0}' is already registered")]
    DuplicateResource(String),

    /// Resource registry is at capacity.
    #[error("resource registry full ({max} resources)")]
    TooManyResources {
        /// Registry capacity.
        max: usize,
    },

    /// Task table is at capacity.
    #[error("task table full ({max} tasks)")]
    TooManyTasks {
        /// Task table capacity.
        max: usize,
    },

    /// Task is already running.
    #[error("task '{name}' ({task}) is already active")]
    AlreadyActive {
        /// Offending task.
        task: TaskId,
        /// Task name.
        name: String,
    },

    /// Resource claimed while another task still owns it.
    #[error("resource {resource} is owned by task {owner}")]
    ResourceConflict {
        /// Contended resource.
        resource: ResourceId,
        /// Current owner.
        owner: TaskId,
    },

    /// Default task does not declare the resource it defaults for.
    #[error("default task '{name}' does not require resource {resource}")]
    DefaultNotRequired {
        /// Resource the default was set on.
        resource: ResourceId,
        /// Task name.
        name: String,
    },

    /// Active task set is at capacity.
    #[error("active task set full ({max} tasks)")]
    ActiveSetFull {
        /// Active set capacity.
        max: usize,
    },

    /// A task faulted during `tick()`; it was retired via `interrupted()`.
    #[error("task '{name}' ({task}) faulted: {source}")]
    TaskFault {
        /// Faulty task.
        task: TaskId,
        /// Task name.
        name: String,
        /// Underlying fault.
        #[source]
        source: TaskError,
    },
}
