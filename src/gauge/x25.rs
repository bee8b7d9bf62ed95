//! X25.168 gauge stepper (Switec X25 family) driven directly from GPIO.
//!
//! The motor has two coils on four pins and is driven in six partial steps
//! per cycle:
//! ```text
//! state  pin1 pin2 pin3 pin4
//!   0     1    0    0    1
//!   1     1    0    0    0
//!   2     1    1    1    0
//!   3     0    1    1    0
//!   4     0    1    1    1
//!   5     0    0    0    1
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::{Direction, StepperMotor};

/// Coil patterns; bit 0 drives pin 1.
const STATE_MAP: [u8; 6] = [0x9, 0x1, 0x7, 0x6, 0xE, 0x8];

pub struct X25Motor<P, D> {
    pins: [P; 4],
    delay: D,
    state: usize,
    steps: u16,
    zero_step_us: u32,
}

impl<P: OutputPin, D: DelayNs> X25Motor<P, D> {
    /// `steps` is the full travel; `zero()` sweeps that many steps backwards
    /// with `zero_step_us` between them.
    pub fn new(pins: [P; 4], delay: D, steps: u16, zero_step_us: u32) -> Self {
        Self {
            pins,
            delay,
            state: 0,
            steps,
            zero_step_us,
        }
    }

    fn write_state(&mut self) {
        let mask = STATE_MAP[self.state];
        for (bit, pin) in self.pins.iter_mut().enumerate() {
            // GPIO writes on the nRF are infallible.
            let _ = if mask & (1 << bit) != 0 {
                pin.set_high()
            } else {
                pin.set_low()
            };
        }
    }
}

impl<P: OutputPin, D: DelayNs> StepperMotor for X25Motor<P, D> {
    fn zero(&mut self) {
        for _ in 0..self.steps {
            self.step(Direction::Backward);
            self.delay.delay_us(self.zero_step_us);
        }
    }

    fn step(&mut self, direction: Direction) {
        self.state = match direction {
            Direction::Forward => (self.state + 1) % STATE_MAP.len(),
            Direction::Backward => (self.state + STATE_MAP.len() - 1) % STATE_MAP.len(),
        };
        self.write_state();
    }
}
