//! Gauge needle driver.
//!
//! [`Gauge`] owns the needle position and target; the coil sequencing is
//! behind [`StepperMotor`].  The needle only ever moves one step per
//! [`Gauge::advance`] call, so the control loop period sets its speed.

#[cfg(feature = "embedded")]
pub mod x25;

/// Direction of a single step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Towards higher step numbers (clockwise).
    Forward,
    /// Towards the zero stop.
    Backward,
}

/// Low-level stepper hardware.
pub trait StepperMotor {
    /// Drive the needle against its mechanical zero stop. May block.
    fn zero(&mut self);

    /// Move exactly one step.
    fn step(&mut self, direction: Direction);
}

/// Positional indicator with travel `[0, steps - 1]`.
pub struct Gauge<M: StepperMotor> {
    motor: M,
    max_step: u16,
    position: u16,
    target: u16,
}

impl<M: StepperMotor> Gauge<M> {
    /// Wrap `motor` with `steps` positions of travel. The position is unknown
    /// until [`calibrate`](Self::calibrate) runs; it is assumed to be 0.
    pub fn new(motor: M, steps: u16) -> Self {
        Self {
            motor,
            max_step: steps.saturating_sub(1),
            position: 0,
            target: 0,
        }
    }

    /// Start-up sequence: zero against the stop, aim at `origin`, settle one step.
    pub fn calibrate(&mut self, origin: u16) {
        self.motor.zero();
        self.position = 0;
        self.target = 0;
        self.set_target(i32::from(origin));
        self.advance();
    }

    /// Aim the needle at `target`, clamped into travel.
    pub fn set_target(&mut self, target: i32) {
        self.target = target.clamp(0, i32::from(self.max_step)) as u16;
    }

    /// Move at most one step toward the target. Returns whether the needle moved.
    pub fn advance(&mut self) -> bool {
        use core::cmp::Ordering;

        match self.position.cmp(&self.target) {
            Ordering::Less => {
                self.motor.step(Direction::Forward);
                self.position += 1;
                true
            }
            Ordering::Greater => {
                self.motor.step(Direction::Backward);
                self.position -= 1;
                true
            }
            Ordering::Equal => false,
        }
    }

    pub fn position(&self) -> u16 {
        self.position
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    pub fn max_step(&self) -> u16 {
        self.max_step
    }

    pub fn at_target(&self) -> bool {
        self.position == self.target
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }
}
