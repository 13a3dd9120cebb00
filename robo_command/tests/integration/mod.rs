//! Shared fixtures for the integration tests.

mod config_file;
mod drive_scenario;
mod preemption;

use std::cell::RefCell;
use std::rc::Rc;

use robo_command::{ResourceSet, Task, TaskError};

/// Callback trace shared between recorder tasks: `(task, callback)`.
pub type Trace = Rc<RefCell<Vec<(&'static str, &'static str)>>>;

pub fn new_trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn drain(trace: &Trace) -> Vec<(&'static str, &'static str)> {
    std::mem::take(&mut *trace.borrow_mut())
}

/// Task that records its callbacks and finishes after `runs` executions.
pub struct Recorder {
    pub name: &'static str,
    pub requirements: ResourceSet,
    pub trace: Trace,
    pub runs: Option<u32>,
    pub fail_on: Option<u32>,
    executed: u32,
}

impl Recorder {
    pub fn new(name: &'static str, requirements: ResourceSet, trace: &Trace) -> Self {
        Self {
            name,
            requirements,
            trace: trace.clone(),
            runs: None,
            fail_on: None,
            executed: 0,
        }
    }

    pub fn runs(mut self, runs: u32) -> Self {
        self.runs = Some(runs);
        self
    }

    pub fn fail_on(mut self, execution: u32) -> Self {
        self.fail_on = Some(execution);
        self
    }

    fn push(&self, callback: &'static str) {
        self.trace.borrow_mut().push((self.name, callback));
    }
}

impl Task for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn initialize(&mut self) {
        self.executed = 0;
        self.push("initialize");
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        self.executed += 1;
        self.push("execute");
        if self.fail_on == Some(self.executed) {
            return Err(TaskError::Actuator(format!("{} jammed", self.name)));
        }
        Ok(())
    }

    fn is_finished(&self) -> Result<bool, TaskError> {
        Ok(self.runs.is_some_and(|n| self.executed >= n))
    }

    fn end(&mut self) {
        self.push("end");
    }

    fn interrupted(&mut self) {
        self.push("interrupted");
    }
}
