//! Operator input: joystick axes, input shaping and arcade mixing.

use std::cell::Cell;
use std::rc::Rc;

use crate::drive::clamp_power;

/// Shared joystick handle.
pub type SharedJoystick = Rc<dyn Joystick>;

/// Two-axis joystick, each axis in [-1, 1].
pub trait Joystick {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
}

/// Joystick whose axes are set programmatically (tests, simulation).
#[derive(Debug, Default)]
pub struct VirtualJoystick {
    x: Cell<f64>,
    y: Cell<f64>,
}

impl VirtualJoystick {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both axes. Values are clamped to [-1, 1].
    pub fn set(&self, x: f64, y: f64) {
        self.x.set(clamp_power(x));
        self.y.set(clamp_power(y));
    }
}

impl Joystick for VirtualJoystick {
    fn x(&self) -> f64 {
        self.x.get()
    }

    fn y(&self) -> f64 {
        self.y.get()
    }
}

/// Cubic input shaping: fine control near center, full range at the stops.
#[inline]
pub fn cubic(v: f64) -> f64 {
    v * v * v
}

/// Arcade mix of forward `y` and turn `x` into `(left, right)` power.
#[inline]
pub fn arcade_mix(x: f64, y: f64) -> (f64, f64) {
    (y + x, y - x)
}
