//! User interface subsystem - OLED status + physical controls.
//!
//! ## Components
//!
//! - **Display**: SSD1306 128×32 OLED via I²C, two text rows used
//! - **Controls**: reset button (active-low) and a position dial on the SAADC
//!
//! [`StatusDisplay`] decides *what* to show; a [`TextSurface`] draws it.

#[cfg(feature = "embedded")]
pub mod display;
#[cfg(feature = "embedded")]
pub mod inputs;

use crate::command::CommandStatus;
use crate::error::Error;
use crate::link::LinkState;

/// Row height of the 6×10 font, in pixels.
pub const LINE_HEIGHT: i32 = 10;

pub const HEADER_CONNECTED: &str = "BLE: Connected";
pub const HEADER_DISCONNECTED: &str = "BLE: Disconnected";

pub const MSG_ON: &str = "Turn on for you !";
pub const MSG_OFF: &str = "Turn off for you !";
pub const MSG_WAITING: &str = "Waiting for order...";
pub const MSG_IDLE: &str = "Press reset to scan";
pub const MSG_SCANNING: &str = "Scanning...";
pub const MSG_CONNECTING: &str = "Connecting...";
pub const MSG_LINK_LOST: &str = "Link lost";

/// Minimal text drawing surface.
pub trait TextSurface {
    /// Blank the frame buffer.
    fn clear(&mut self);

    /// Move the text cursor (top-left of the next glyph).
    fn set_cursor(&mut self, x: i32, y: i32);

    /// Draw `text` at the cursor and move the cursor past it.
    fn write_text(&mut self, text: &str);

    /// Push the frame buffer to the panel.
    fn present(&mut self) -> Result<(), Error>;
}

/// One rendered frame: a header row and a detail row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusScreen {
    pub header: &'static str,
    pub detail: &'static str,
}

impl StatusScreen {
    pub fn for_state(link: LinkState, command: CommandStatus) -> Self {
        match link {
            LinkState::Connected => Self {
                header: HEADER_CONNECTED,
                detail: match command {
                    CommandStatus::On => MSG_ON,
                    CommandStatus::Off => MSG_OFF,
                    CommandStatus::Waiting => MSG_WAITING,
                },
            },
            other => Self {
                header: HEADER_DISCONNECTED,
                detail: match other {
                    LinkState::ScanRequested => MSG_SCANNING,
                    LinkState::ConnectRequested => MSG_CONNECTING,
                    LinkState::Disconnected => MSG_LINK_LOST,
                    _ => MSG_IDLE,
                },
            },
        }
    }
}

/// Status renderer. Only constructible from an initialised surface.
pub struct StatusDisplay<S: TextSurface> {
    surface: S,
    last: Option<StatusScreen>,
}

impl<S: TextSurface> StatusDisplay<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            last: None,
        }
    }

    /// Start-up splash shown before the first link state is known.
    pub fn render_boot(&mut self) -> Result<(), Error> {
        self.surface.clear();
        self.surface.set_cursor(0, 0);
        self.surface.write_text(MSG_WAITING);
        self.last = None;
        self.surface.present()
    }

    /// Redraw the whole frame for the given state.
    pub fn render(&mut self, link: LinkState, command: CommandStatus) -> Result<(), Error> {
        let screen = StatusScreen::for_state(link, command);
        self.surface.clear();
        self.surface.set_cursor(0, 0);
        self.surface.write_text(screen.header);
        self.surface.set_cursor(0, LINE_HEIGHT);
        self.surface.write_text(screen.detail);
        self.last = Some(screen);
        self.surface.present()
    }

    /// Screen drawn by the last [`render`](Self::render).
    pub fn last_rendered(&self) -> Option<StatusScreen> {
        self.last
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

/// Snapshot of the manual controls, polled once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManualInput {
    /// Reset button held down.
    pub reset_pressed: bool,
    /// Raw dial reading, `0..=GaugeConfig::dial_max`.
    pub dial: u16,
}

/// Source of [`ManualInput`] samples.
#[allow(async_fn_in_trait)]
pub trait InputPanel {
    async fn sample(&mut self) -> ManualInput;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSurface, SurfaceOp};

    #[test]
    fn connected_screens_follow_the_command() {
        let on = StatusScreen::for_state(LinkState::Connected, CommandStatus::On);
        assert_eq!(on.header, HEADER_CONNECTED);
        assert_eq!(on.detail, MSG_ON);
        assert_eq!(
            StatusScreen::for_state(LinkState::Connected, CommandStatus::Off).detail,
            MSG_OFF
        );
        assert_eq!(
            StatusScreen::for_state(LinkState::Connected, CommandStatus::Waiting).detail,
            MSG_WAITING
        );
    }

    #[test]
    fn disconnected_screens_ignore_the_command() {
        for command in [CommandStatus::Waiting, CommandStatus::On, CommandStatus::Off] {
            for (link, detail) in [
                (LinkState::Idle, MSG_IDLE),
                (LinkState::ScanRequested, MSG_SCANNING),
                (LinkState::ConnectRequested, MSG_CONNECTING),
                (LinkState::Disconnected, MSG_LINK_LOST),
            ] {
                let screen = StatusScreen::for_state(link, command);
                assert_eq!(screen.header, HEADER_DISCONNECTED);
                assert_eq!(screen.detail, detail);
            }
        }
    }

    #[test]
    fn messages_fit_the_panel_width() {
        // 128 px / 6 px glyphs.
        for text in [
            HEADER_CONNECTED,
            HEADER_DISCONNECTED,
            MSG_ON,
            MSG_OFF,
            MSG_WAITING,
            MSG_IDLE,
            MSG_SCANNING,
            MSG_CONNECTING,
            MSG_LINK_LOST,
        ] {
            assert!(text.len() <= 21, "{text} is too wide");
        }
    }

    #[test]
    fn render_redraws_the_full_frame() {
        let mut display = StatusDisplay::new(RecordingSurface::default());
        display
            .render(LinkState::Connected, CommandStatus::On)
            .unwrap();

        assert_eq!(
            display.surface().ops.as_slice(),
            &[
                SurfaceOp::Clear,
                SurfaceOp::Cursor(0, 0),
                SurfaceOp::Text(HEADER_CONNECTED.into()),
                SurfaceOp::Cursor(0, 10),
                SurfaceOp::Text(MSG_ON.into()),
                SurfaceOp::Present,
            ]
        );
        assert_eq!(
            display.last_rendered(),
            Some(StatusScreen {
                header: HEADER_CONNECTED,
                detail: MSG_ON
            })
        );
    }

    #[test]
    fn render_is_idempotent() {
        let mut display = StatusDisplay::new(RecordingSurface::default());
        display
            .render(LinkState::Disconnected, CommandStatus::Waiting)
            .unwrap();
        display
            .render(LinkState::Disconnected, CommandStatus::Waiting)
            .unwrap();

        let frames = display.surface().frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], frames[1]);
    }

    #[test]
    fn boot_screen_shows_waiting() {
        let mut display = StatusDisplay::new(RecordingSurface::default());
        display.render_boot().unwrap();
        assert!(display
            .surface()
            .ops
            .contains(&SurfaceOp::Text(MSG_WAITING.into())));
        assert_eq!(display.last_rendered(), None);
    }

    #[test]
    fn present_failure_is_reported() {
        let mut surface = RecordingSurface::default();
        surface.fail_present = true;
        let mut display = StatusDisplay::new(surface);
        assert_eq!(
            display.render(LinkState::Idle, CommandStatus::Waiting),
            Err(Error::Display)
        );
    }
}
