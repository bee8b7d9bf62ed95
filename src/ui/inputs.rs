//! Reset button + position dial.
//!
//! The button is active-low with the internal pull-up; the dial is a
//! potentiometer on one SAADC channel, sampled at 12 bits.

use embassy_nrf::gpio::Input;
use embassy_nrf::saadc::Saadc;

use crate::ui::{InputPanel, ManualInput};

pub struct PanelInputs<'d> {
    reset: Input<'d>,
    dial: Saadc<'d, 1>,
    dial_max: u16,
}

impl<'d> PanelInputs<'d> {
    /// `dial` must already be calibrated.
    pub fn new(reset: Input<'d>, dial: Saadc<'d, 1>, dial_max: u16) -> Self {
        Self {
            reset,
            dial,
            dial_max,
        }
    }
}

impl InputPanel for PanelInputs<'_> {
    async fn sample(&mut self) -> ManualInput {
        let mut buf = [0i16; 1];
        self.dial.sample(&mut buf).await;

        ManualInput {
            reset_pressed: self.reset.is_low(),
            // Single-ended readings dip slightly below zero near ground.
            dial: (buf[0].max(0) as u16).min(self.dial_max),
        }
    }
}
