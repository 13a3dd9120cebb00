//! Cooperative task scheduler with exclusive resource arbitration.
//!
//! The scheduler owns the resource registry and the task table, and keeps
//! the ordered active set. Two entry points mutate it:
//!
//! - [`Scheduler::schedule`] starts a task, interrupting every task that owns
//!   one of its resources first. A preempted task loses *all* its resources.
//! - [`Scheduler::tick`] runs `execute()` + `is_finished()` for every task
//!   that was active when the tick started, in insertion order, and retires
//!   the finished ones.
//!
//! Whenever resources are released, every idle resource with a default task
//! gets that default re-armed before the operation returns. Re-arming never
//! preempts: a default whose requirements are not all idle waits until they
//! are, so it cannot undo the step that freed its resource and chains of
//! defaults terminate. A default that could not start because the active set
//! was full is retried at the end of every tick until it starts.
//!
//! ## Zero-Allocation Tick
//!
//! The active set and the per-tick snapshot are fixed-capacity `heapless`
//! vectors. Registration (`register_resource`, `add_task`) allocates and is
//! meant for startup.

use heapless::Vec as FixedVec;
use robo_common::consts::{MAX_ACTIVE_TASKS, MAX_RESOURCES};
use tracing::{debug, error, trace, warn};

use crate::error::SchedulerError;
use crate::resource::{Resource, ResourceId, ResourceSet};
use crate::task::{Task, TaskEvent, TaskExit, TaskId, TaskSlot, TaskState, TransitionResult};

/// Task scheduler and resource registry.
pub struct Scheduler {
    resources: Vec<Resource>,
    tasks: Vec<TaskSlot>,
    active: FixedVec<TaskId, MAX_ACTIVE_TASKS>,
    tick_count: u64,
    /// A default task failed to start and must be retried.
    rearm_pending: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            tasks: Vec::new(),
            active: FixedVec::new(),
            tick_count: 0,
            rearm_pending: false,
        }
    }

    // ─── Registration ───────────────────────────────────────────────

    /// Register a named resource.
    ///
    /// # Errors
    /// `DuplicateResource` if the name is taken, `TooManyResources` past
    /// `MAX_RESOURCES`.
    pub fn register_resource(&mut self, name: &str) -> Result<ResourceId, SchedulerError> {
        if self.resources.iter().any(|r| r.name() == name) {
            return Err(SchedulerError::DuplicateResource(name.to_string()));
        }
        let id = u8::try_from(self.resources.len())
            .ok()
            .and_then(ResourceId::from_raw)
            .ok_or(SchedulerError::TooManyResources { max: MAX_RESOURCES })?;

        self.resources.push(Resource::new(id, name));
        debug!(resource = name, %id, "resource registered");
        Ok(id)
    }

    /// Add a task to the task table. The task is not scheduled.
    pub fn add_task(&mut self, task: impl Task + 'static) -> Result<TaskId, SchedulerError> {
        self.add_boxed_task(Box::new(task))
    }

    /// Add an already boxed task to the task table.
    pub fn add_boxed_task(&mut self, task: Box<dyn Task>) -> Result<TaskId, SchedulerError> {
        let id = u16::try_from(self.tasks.len())
            .map(TaskId::from_raw)
            .map_err(|_| SchedulerError::TooManyTasks {
                max: u16::MAX as usize + 1,
            })?;

        let slot = TaskSlot::new(task);
        debug!(task = %slot.name, %id, requirements = slot.requirements.len(), "task added");
        self.tasks.push(slot);
        Ok(id)
    }

    /// Install `task` as the default task of `resource`.
    ///
    /// The task must require the resource. If its requirements are all idle
    /// the default is armed immediately.
    pub fn set_default_task(
        &mut self,
        resource: ResourceId,
        task: TaskId,
    ) -> Result<(), SchedulerError> {
        let slot = self.slot(task)?;
        self.check_registered(ResourceSet::single(resource))?;
        if !slot.requirements.contains(resource) {
            return Err(SchedulerError::DefaultNotRequired {
                resource,
                name: slot.name.clone(),
            });
        }
        self.check_registered(slot.requirements)?;

        debug!(resource = %self.resources[resource.index()].name(), task = %slot.name, "default task set");
        self.resources[resource.index()].set_default_task(task);
        self.rearm_defaults();
        Ok(())
    }

    // ─── Scheduling ─────────────────────────────────────────────────

    /// Start `task`, preempting the owners of its resources.
    ///
    /// All checks run before any callback, so a rejected call leaves the
    /// scheduler untouched.
    ///
    /// # Errors
    /// `UnknownTask`, `UnknownResource`, `AlreadyActive`, `ActiveSetFull`.
    pub fn schedule(&mut self, task: TaskId) -> Result<(), SchedulerError> {
        let mut released = ResourceSet::EMPTY;
        self.start(task, &mut released)?;
        if !released.is_empty() {
            self.rearm_defaults();
        }
        Ok(())
    }

    /// Cancel `task` externally.
    ///
    /// An active task receives `interrupted()` and releases its resources;
    /// defaults are re-armed. Returns `false` if the task was not active.
    pub fn cancel(&mut self, task: TaskId) -> Result<bool, SchedulerError> {
        if !self.slot(task)?.lifecycle.is_active() {
            return Ok(false);
        }
        let mut released = ResourceSet::EMPTY;
        self.retire(task, TaskExit::Interrupted, &mut released);
        self.rearm_defaults();
        Ok(true)
    }

    /// Advance every active task by one control cycle.
    ///
    /// Only tasks active at the start of the tick run; tasks started during
    /// the tick (re-armed defaults) wait for the next one. A faulty task is
    /// retired via `interrupted()` and the remaining tasks still run; the
    /// first fault is returned once the tick completes.
    pub fn tick(&mut self) -> Result<(), SchedulerError> {
        self.tick_count += 1;

        let mut snapshot: FixedVec<(TaskId, u64), MAX_ACTIVE_TASKS> = FixedVec::new();
        for &id in self.active.iter() {
            // Capacities match, cannot overflow.
            let _ = snapshot.push((id, self.tasks[id.index()].activations));
        }

        let mut first_fault = None;
        for (id, activation) in snapshot {
            let slot = &mut self.tasks[id.index()];
            // Retired (or retired and restarted) earlier in this tick.
            if slot.lifecycle.state() != TaskState::Running || slot.activations != activation {
                continue;
            }

            trace!(task = %slot.name, "execute");
            let outcome = slot
                .task
                .execute()
                .and_then(|()| slot.task.is_finished());

            let mut released = ResourceSet::EMPTY;
            match outcome {
                Ok(false) => continue,
                Ok(true) => self.retire(id, TaskExit::Completed, &mut released),
                Err(source) => {
                    error!(task = %slot.name, %id, error = %source, "task faulted");
                    let name = slot.name.clone();
                    self.retire(id, TaskExit::Faulted, &mut released);
                    if first_fault.is_none() {
                        first_fault = Some(SchedulerError::TaskFault {
                            task: id,
                            name,
                            source,
                        });
                    }
                }
            }
            if !released.is_empty() {
                self.rearm_defaults();
            }
        }

        if self.rearm_pending {
            self.rearm_defaults();
        }

        first_fault.map_or(Ok(()), Err)
    }

    // ─── Queries ────────────────────────────────────────────────────

    /// Number of completed `tick()` calls.
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Active tasks in execution order.
    #[inline]
    pub fn active_tasks(&self) -> &[TaskId] {
        &self.active
    }

    #[inline]
    pub fn is_active(&self, task: TaskId) -> bool {
        self.active.contains(&task)
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    /// Look a resource up by name.
    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resources.iter().find(|r| r.name() == name).map(Resource::id)
    }

    /// Current owner of a resource.
    pub fn owner(&self, id: ResourceId) -> Option<TaskId> {
        self.resource(id).and_then(Resource::owner)
    }

    pub fn default_task(&self, id: ResourceId) -> Option<TaskId> {
        self.resource(id).and_then(Resource::default_task)
    }

    pub fn state(&self, task: TaskId) -> Option<TaskState> {
        self.tasks.get(task.index()).map(|s| s.lifecycle.state())
    }

    /// How the last activation of `task` ended, if any did.
    pub fn last_exit(&self, task: TaskId) -> Option<TaskExit> {
        self.tasks.get(task.index()).and_then(|s| s.last_exit)
    }

    /// Number of times `task` has been started.
    pub fn activations(&self, task: TaskId) -> u64 {
        self.tasks.get(task.index()).map_or(0, |s| s.activations)
    }

    pub fn task_name(&self, task: TaskId) -> Option<&str> {
        self.tasks.get(task.index()).map(|s| s.name.as_str())
    }

    pub fn requirements(&self, task: TaskId) -> Option<ResourceSet> {
        self.tasks.get(task.index()).map(|s| s.requirements)
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn slot(&self, task: TaskId) -> Result<&TaskSlot, SchedulerError> {
        self.tasks
            .get(task.index())
            .ok_or(SchedulerError::UnknownTask(task))
    }

    fn check_registered(&self, requirements: ResourceSet) -> Result<(), SchedulerError> {
        match requirements
            .iter()
            .find(|r| r.index() >= self.resources.len())
        {
            Some(unknown) => Err(SchedulerError::UnknownResource(unknown)),
            None => Ok(()),
        }
    }

    /// Preempt, claim, initialize. Resources freed by preemption are added
    /// to `released` (minus the ones `task` claims).
    fn start(&mut self, task: TaskId, released: &mut ResourceSet) -> Result<(), SchedulerError> {
        let slot = self.slot(task)?;
        let requirements = slot.requirements;
        self.check_registered(requirements)?;
        if slot.lifecycle.is_active() {
            return Err(SchedulerError::AlreadyActive {
                task,
                name: slot.name.clone(),
            });
        }

        let mut preempted: FixedVec<TaskId, MAX_RESOURCES> = FixedVec::new();
        for r in requirements {
            if let Some(owner) = self.resources[r.index()].owner() {
                if !preempted.contains(&owner) {
                    let _ = preempted.push(owner);
                }
            }
        }
        if self.active.len() - preempted.len() >= MAX_ACTIVE_TASKS {
            return Err(SchedulerError::ActiveSetFull {
                max: MAX_ACTIVE_TASKS,
            });
        }

        for owner in preempted {
            debug!(
                task = %self.tasks[owner.index()].name,
                by = %self.tasks[task.index()].name,
                "preempting"
            );
            self.retire(owner, TaskExit::Interrupted, released);
        }

        for r in requirements {
            self.resources[r.index()].claim(task)?;
            released.remove(r);
        }

        let slot = &mut self.tasks[task.index()];
        slot.lifecycle.handle_event(TaskEvent::Schedule);
        slot.activations += 1;
        debug!(task = %slot.name, %task, activation = slot.activations, "initialize");
        slot.task.initialize();
        slot.lifecycle.handle_event(TaskEvent::Start);

        self.active
            .push(task)
            .map_err(|_| SchedulerError::ActiveSetFull {
                max: MAX_ACTIVE_TASKS,
            })
    }

    /// Deliver the terminal callback, release every resource, leave the active set.
    fn retire(&mut self, task: TaskId, exit: TaskExit, released: &mut ResourceSet) {
        let slot = &mut self.tasks[task.index()];
        let event = match exit {
            TaskExit::Completed => TaskEvent::Complete,
            TaskExit::Interrupted | TaskExit::Faulted => TaskEvent::Interrupt,
        };
        if let TransitionResult::Rejected(reason) = slot.lifecycle.handle_event(event) {
            error!(task = %slot.name, %task, reason, "terminal callback suppressed");
            return;
        }

        match exit {
            TaskExit::Completed => {
                debug!(task = %slot.name, %task, "end");
                slot.task.end();
            }
            TaskExit::Interrupted | TaskExit::Faulted => {
                debug!(task = %slot.name, %task, ?exit, "interrupted");
                slot.task.interrupted();
            }
        }
        slot.last_exit = Some(exit);

        let requirements = slot.requirements;
        for r in requirements {
            if self.resources[r.index()].release(task) {
                released.insert(r);
            }
        }
        self.active.retain(|t| *t != task);
    }

    /// Resources currently held by some task.
    fn owned(&self) -> ResourceSet {
        self.resources
            .iter()
            .filter(|r| !r.is_idle())
            .map(Resource::id)
            .collect()
    }

    /// Start the default task of every idle resource, in registry order.
    fn rearm_defaults(&mut self) {
        let retrying = std::mem::take(&mut self.rearm_pending);
        for index in 0..self.resources.len() {
            let resource = &self.resources[index];
            let Some(default) = resource.default_task() else {
                continue;
            };
            let slot = &self.tasks[default.index()];
            if !resource.is_idle() || slot.lifecycle.is_active() {
                continue;
            }
            if slot.requirements.intersects(self.owned()) {
                trace!(task = %slot.name, "default task waits for its resources");
                continue;
            }

            debug!(resource = %resource.name(), task = %slot.name, "re-arming default task");
            let mut released = ResourceSet::EMPTY;
            if let Err(e) = self.start(default, &mut released) {
                if retrying {
                    trace!(task = %default, error = %e, "default task still not re-armed");
                } else {
                    warn!(task = %default, error = %e, "default task not re-armed, retrying every tick");
                }
                self.rearm_pending = true;
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
