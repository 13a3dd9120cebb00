//! Drive-train collaborator.
//!
//! Tasks never own the drive hardware; they share a handle to it and the
//! scheduler guarantees that only the owner of the drive resource commands
//! it. `SimDrive` stands in for the motors and the left encoder.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::TaskError;

/// Shared drive handle held by every task requiring the drive resource.
pub type SharedDrive = Rc<RefCell<dyn DriveTrain>>;

/// Two-sided differential drive with a left-side encoder.
pub trait DriveTrain {
    /// Command both sides. Values are clamped to [-1, 1].
    fn set_power(&mut self, left: f64, right: f64);

    /// Left encoder reading [counts].
    fn left_encoder(&self) -> Result<f64, TaskError>;

    /// Zero the left encoder.
    fn reset_left_encoder(&mut self);
}

/// Clamp a power command to the valid motor range. NaN maps to 0.
#[inline]
pub fn clamp_power(power: f64) -> f64 {
    if power.is_nan() {
        0.0
    } else {
        power.clamp(-1.0, 1.0)
    }
}

/// Software drive train.
///
/// Each `advance()` integrates the left power into the encoder at
/// `counts_per_tick` counts per tick of full power.
#[derive(Debug, Clone)]
pub struct SimDrive {
    left: f64,
    right: f64,
    encoder: f64,
    counts_per_tick: f64,
    encoder_fault: Option<String>,
}

impl SimDrive {
    pub fn new(counts_per_tick: f64) -> Self {
        Self {
            left: 0.0,
            right: 0.0,
            encoder: 0.0,
            counts_per_tick,
            encoder_fault: None,
        }
    }

    /// Wrap into the shared handle form used by the scheduler side and the driver.
    pub fn shared(counts_per_tick: f64) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(counts_per_tick)))
    }

    /// Last commanded `(left, right)` power.
    #[inline]
    pub fn power(&self) -> (f64, f64) {
        (self.left, self.right)
    }

    /// Move the simulated robot by one tick.
    pub fn advance(&mut self) {
        self.encoder += self.left * self.counts_per_tick;
    }

    /// Make subsequent encoder reads fail (`Some`) or succeed again (`None`).
    pub fn inject_encoder_fault(&mut self, fault: Option<&str>) {
        self.encoder_fault = fault.map(str::to_string);
    }
}

impl DriveTrain for SimDrive {
    fn set_power(&mut self, left: f64, right: f64) {
        self.left = clamp_power(left);
        self.right = clamp_power(right);
    }

    fn left_encoder(&self) -> Result<f64, TaskError> {
        match &self.encoder_fault {
            Some(reason) => Err(TaskError::Sensor(format!("left encoder: {reason}"))),
            None => Ok(self.encoder),
        }
    }

    fn reset_left_encoder(&mut self) {
        self.encoder = 0.0;
    }
}
