//! Control loop - the single owner of the gauge, the display and the link
//! manager.
//!
//! One [`ControlLoop::tick`] per period:
//!
//! 1. dispatch a pending connect request (awaited, no retry);
//! 2. restart discovery if a disconnect asked for it;
//! 3. sample the manual controls;
//! 4. connected: steer the needle and refresh the screen every
//!    `display_cadence` ticks; otherwise redraw the disconnected screen and
//!    let the reset button re-arm discovery.

use uuid::Uuid;

use crate::command::CommandStatus;
use crate::config::GaugeConfig;
use crate::gauge::{Gauge, StepperMotor};
use crate::link::{LinkManager, LinkState, Radio};
use crate::ui::{InputPanel, ManualInput, StatusDisplay, TextSurface};


/// Coarse phase of the loop, derived from [`LinkState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopPhase {
    Disconnected,
    Connecting,
    Connected,
}

impl From<LinkState> for LoopPhase {
    fn from(state: LinkState) -> Self {
        match state {
            LinkState::Connected => LoopPhase::Connected,
            LinkState::ConnectRequested => LoopPhase::Connecting,
            LinkState::Idle | LinkState::ScanRequested | LinkState::Disconnected => {
                LoopPhase::Disconnected
            }
        }
    }
}

/// Needle target while connected.
///
/// Reset wins over a command, a command wins over the dial.
pub fn resolve_target(input: &ManualInput, command: CommandStatus, config: &GaugeConfig) -> i32 {
    if input.reset_pressed {
        return i32::from(config.origin);
    }
    config
        .command_target(command)
        .unwrap_or_else(|| config.dial_target(input.dial))
}

pub struct ControlLoop<'a, R, M, S, I>
where
    R: Radio,
    M: StepperMotor,
    S: TextSurface,
    I: InputPanel,
{
    config: GaugeConfig,
    service: Uuid,
    link: LinkManager<'a, R>,
    gauge: Gauge<M>,
    display: StatusDisplay<S>,
    inputs: I,
    refresh_clock: u8,
}

impl<'a, R, M, S, I> ControlLoop<'a, R, M, S, I>
where
    R: Radio,
    M: StepperMotor,
    S: TextSurface,
    I: InputPanel,
{
    /// `service` is the UUID discovery filters on.
    pub fn new(
        config: GaugeConfig,
        service: Uuid,
        link: LinkManager<'a, R>,
        motor: M,
        display: StatusDisplay<S>,
        inputs: I,
    ) -> Self {
        Self {
            gauge: Gauge::new(motor, config.steps),
            config,
            service,
            link,
            display,
            inputs,
            refresh_clock: 0,
        }
    }

    /// Start-up: home the needle, show the boot screen, begin scanning.
    pub async fn start(&mut self) {
        info!("Starting gauge client");
        self.gauge.calibrate(self.config.origin);
        if let Err(e) = self.display.render_boot() {
            warn!("Display update failed: {}", e);
        }
        self.link.start_discovery(&self.service);
    }

    pub async fn tick(&mut self) {
        if let Some(peer) = self.link.take_connect_request() {
            if self.link.attempt_connect(peer).await.is_ok() {
                info!("We are now connected to the BLE Server.");
                self.refresh_clock = 0;
                self.render();
            }
        }

        if self.link.shared().take_rescan_request() {
            info!("Link lost, scanning again");
            self.link.start_discovery(&self.service);
        }

        let input = self.inputs.sample().await;
        let shared = self.link.shared();

        match shared.link_state() {
            LinkState::Connected => {
                let target = resolve_target(&input, shared.command_status(), &self.config);
                self.gauge.set_target(target);
                self.gauge.advance();
                trace!("needle {} -> {}", self.gauge.position(), self.gauge.target());

                self.refresh_clock = self.refresh_clock.saturating_add(1);
                if self.refresh_clock >= self.config.display_cadence {
                    self.render();
                    self.refresh_clock = 0;
                }
            }
            state => {
                if input.reset_pressed
                    && matches!(state, LinkState::Idle | LinkState::Disconnected)
                {
                    info!("Reset pressed, scanning");
                    self.link.start_discovery(&self.service);
                }
                self.render();
            }
        }
    }

    fn render(&mut self) {
        let shared = self.link.shared();
        if let Err(e) = self
            .display
            .render(shared.link_state(), shared.command_status())
        {
            warn!("Display update failed: {}", e);
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.link.shared().link_state().into()
    }

    /// Ticks since the last connected-state refresh.
    pub fn refresh_clock(&self) -> u8 {
        self.refresh_clock
    }

    pub fn gauge(&self) -> &Gauge<M> {
        &self.gauge
    }

    pub fn display(&self) -> &StatusDisplay<S> {
        &self.display
    }

    pub fn link(&self) -> &LinkManager<'a, R> {
        &self.link
    }

    pub fn inputs_mut(&mut self) -> &mut I {
        &mut self.inputs
    }
}
