//! Open-loop drive for a fixed time, counted in scheduler ticks.

use std::time::Duration;

use tracing::debug;

use crate::drive::SharedDrive;
use crate::error::TaskError;
use crate::resource::{ResourceId, ResourceSet};
use crate::task::Task;

pub struct DriveForTime {
    drive: SharedDrive,
    requirements: ResourceSet,
    power: f64,
    ticks: u64,
    elapsed: u64,
}

impl DriveForTime {
    /// `duration` is converted to whole ticks of `tick_period`, rounded up.
    pub fn new(
        drive: SharedDrive,
        drive_resource: ResourceId,
        power: f64,
        duration: Duration,
        tick_period: Duration,
    ) -> Self {
        Self {
            drive,
            requirements: ResourceSet::single(drive_resource),
            power,
            ticks: ticks_for(duration, tick_period),
            elapsed: 0,
        }
    }

    /// Number of executed ticks after which the task finishes.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

fn ticks_for(duration: Duration, tick_period: Duration) -> u64 {
    let period = tick_period.as_nanos().max(1);
    let ticks = duration.as_nanos().div_ceil(period);
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

impl Task for DriveForTime {
    fn name(&self) -> &str {
        "DriveForTime"
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn initialize(&mut self) {
        debug!(power = self.power, ticks = self.ticks, "driving for time");
        self.elapsed = 0;
        self.drive.borrow_mut().set_power(self.power, self.power);
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        self.elapsed += 1;
        Ok(())
    }

    fn is_finished(&self) -> Result<bool, TaskError> {
        Ok(self.elapsed >= self.ticks)
    }

    fn end(&mut self) {
        self.drive.borrow_mut().set_power(0.0, 0.0);
    }
}
