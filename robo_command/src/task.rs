//! Task capability trait and per-activation lifecycle.
//!
//! A task is a unit of control-loop work with a fixed set of required
//! resources and five callbacks, all driven by the scheduler:
//!
//! ```text
//!            schedule()             start
//!   Idle ──────────────► Initialized ─────► Running
//!    ▲                        │                │
//!    │        interrupt       │                │ is_finished() == true
//!    └────────────────────────┴────────────────┤
//!                                              ▼
//!   (reschedulable) ◄──────────────────── Finished  [end()]
//! ```
//!
//! Interruption collapses back to `Idle` and delivers `interrupted()`;
//! normal completion lands in `Finished` and delivers `end()`. The two are
//! mutually exclusive per activation: the scheduler only delivers a terminal
//! callback after the matching transition has been accepted here.

use std::fmt;

use crate::error::TaskError;
use crate::resource::ResourceSet;

/// Opaque handle to a task registered with a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u16);

impl TaskId {
    /// Build a handle from its raw index.
    #[inline]
    pub const fn from_raw(index: u16) -> Self {
        Self(index)
    }

    /// Raw task-table index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Schedulable unit of work.
///
/// Callbacks must not block: the whole active set shares one tick budget.
/// The same object may be activated many times, so `initialize()` has to
/// reset all per-activation state.
pub trait Task {
    /// Human-readable name for logs and errors.
    fn name(&self) -> &str;

    /// Resources this task needs exclusively.
    ///
    /// Read once when the task is added to a scheduler and never again.
    fn requirements(&self) -> ResourceSet;

    /// Called once when the task starts, after conflicting owners were interrupted.
    fn initialize(&mut self) {}

    /// Called once per tick while running.
    fn execute(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Called right after `execute()`; `Ok(true)` ends the activation.
    fn is_finished(&self) -> Result<bool, TaskError>;

    /// Normal-completion cleanup.
    fn end(&mut self) {}

    /// Cleanup after preemption, cancellation or a fault.
    ///
    /// Defaults to `end()` so both terminal paths leave actuators safe.
    fn interrupted(&mut self) {
        self.end();
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskState {
    /// Never scheduled, or interrupted.
    #[default]
    Idle,
    /// `initialize()` in progress.
    Initialized,
    /// In the active set, executed every tick.
    Running,
    /// Completed normally (`end()` delivered).
    Finished,
}

/// Event driving a `TaskState` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// Scheduling succeeded, resources claimed.
    Schedule,
    /// `initialize()` returned.
    Start,
    /// `is_finished()` returned true.
    Complete,
    /// Preempted, cancelled or faulted.
    Interrupt,
}

/// How the last activation of a task terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    /// `is_finished()` returned true, `end()` delivered.
    Completed,
    /// Preempted or cancelled, `interrupted()` delivered.
    Interrupted,
    /// `execute()`/`is_finished()` faulted, `interrupted()` delivered.
    Faulted,
}

/// Result of a lifecycle transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition accepted: new state.
    Ok(TaskState),
    /// Transition rejected: reason.
    Rejected(&'static str),
}

/// Per-task lifecycle holding the current state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLifecycle {
    state: TaskState,
}

impl TaskLifecycle {
    pub const fn new() -> Self {
        Self {
            state: TaskState::Idle,
        }
    }

    #[inline]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// True while the task holds its resources.
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, TaskState::Initialized | TaskState::Running)
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: TaskEvent) -> TransitionResult {
        use TaskEvent::*;
        use TaskState::*;

        let next = match (self.state, event) {
            (Idle | Finished, Schedule) => Initialized,
            (Initialized, Start) => Running,
            (Running, Complete) => Finished,
            (Initialized | Running, Interrupt) => Idle,
            (Initialized | Running, Schedule) => {
                return TransitionResult::Rejected("task is already active");
            }
            (Idle | Finished, Complete | Interrupt) => {
                return TransitionResult::Rejected("terminal callback already delivered");
            }
            _ => return TransitionResult::Rejected("invalid lifecycle transition"),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

/// Scheduler-side record of a registered task.
pub(crate) struct TaskSlot {
    pub(crate) task: Box<dyn Task>,
    pub(crate) name: String,
    pub(crate) requirements: ResourceSet,
    pub(crate) lifecycle: TaskLifecycle,
    pub(crate) activations: u64,
    pub(crate) last_exit: Option<TaskExit>,
}

impl TaskSlot {
    pub(crate) fn new(task: Box<dyn Task>) -> Self {
        let name = task.name().to_string();
        let requirements = task.requirements();
        Self {
            task,
            name,
            requirements,
            lifecycle: TaskLifecycle::new(),
            activations: 0,
            last_exit: None,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
