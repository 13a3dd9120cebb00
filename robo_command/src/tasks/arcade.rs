//! Teleoperated arcade drive, the default task of the drive resource.

use tracing::debug;

use crate::drive::SharedDrive;
use crate::error::TaskError;
use crate::input::{SharedJoystick, arcade_mix, cubic};
use crate::resource::{ResourceId, ResourceSet};
use crate::task::Task;

/// Drives from the joystick every tick. Never finishes on its own.
pub struct ArcadeDrive {
    drive: SharedDrive,
    joystick: SharedJoystick,
    requirements: ResourceSet,
}

impl ArcadeDrive {
    pub fn new(drive: SharedDrive, joystick: SharedJoystick, drive_resource: ResourceId) -> Self {
        Self {
            drive,
            joystick,
            requirements: ResourceSet::single(drive_resource),
        }
    }
}

impl Task for ArcadeDrive {
    fn name(&self) -> &str {
        "ArcadeDrive"
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        let x = cubic(self.joystick.x());
        let y = cubic(self.joystick.y());
        let (left, right) = arcade_mix(x, y);
        self.drive.borrow_mut().set_power(left, right);
        Ok(())
    }

    fn is_finished(&self) -> Result<bool, TaskError> {
        Ok(false)
    }

    fn end(&mut self) {
        debug!("arcade drive released, stopping motors");
        self.drive.borrow_mut().set_power(0.0, 0.0);
    }
}
