//! Open-loop drive until the left encoder reaches a distance.

use tracing::debug;

use crate::drive::SharedDrive;
use crate::error::TaskError;
use crate::resource::{ResourceId, ResourceSet};
use crate::task::Task;

pub struct DriveForDistance {
    drive: SharedDrive,
    requirements: ResourceSet,
    power: f64,
    distance: f64,
}

impl DriveForDistance {
    /// `distance` is in encoder counts.
    pub fn new(drive: SharedDrive, drive_resource: ResourceId, power: f64, distance: f64) -> Self {
        Self {
            drive,
            requirements: ResourceSet::single(drive_resource),
            power,
            distance,
        }
    }
}

impl Task for DriveForDistance {
    fn name(&self) -> &str {
        "DriveForDistance"
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn initialize(&mut self) {
        debug!(power = self.power, distance = self.distance, "driving for distance");
        let mut drive = self.drive.borrow_mut();
        drive.reset_left_encoder();
        drive.set_power(self.power, self.power);
    }

    fn is_finished(&self) -> Result<bool, TaskError> {
        Ok(self.drive.borrow().left_encoder()? >= self.distance)
    }

    fn end(&mut self) {
        self.drive.borrow_mut().set_power(0.0, 0.0);
    }
}
