//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

use uuid::Uuid;

use crate::command::CommandStatus;

// BLE

/// Service the remote command peripheral advertises.
pub const COMMAND_SERVICE_UUID: Uuid = uuid::uuid!("4fafc201-1fb5-459e-8fcc-c5c9c331914b");

/// Characteristic carrying the `on` / `off` command notifications.
pub const COMMAND_CHAR_UUID: Uuid = uuid::uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a8");

/// Duration of a BLE scan window (seconds). The scan stops earlier on the first match.
pub const BLE_SCAN_DURATION_SECS: u16 = 5;

/// Scan interval and window (ms). Converted to 0.625 ms units by the radio.
pub const BLE_SCAN_INTERVAL_MS: u32 = 1349;
pub const BLE_SCAN_WINDOW_MS: u32 = 449;

/// Active scan so scan-response data (device names) shows up in the logs.
pub const BLE_ACTIVE_SCAN: bool = true;

/// ATT MTU requested right after connecting.
pub const ATT_MTU: u16 = 517;

/// Largest notification payload the SoftDevice can hand us (ATT_MTU - 3).
pub const NOTIFY_PAYLOAD_MAX: usize = 514;

/// Bytes kept from the one-shot characteristic read on connect.
pub const READ_BUFFER_LEN: usize = 64;

// Gauge (X25.168 stepper, 315° sweep)

/// Total quarter-steps of needle travel.
pub const GAUGE_STEPS: u16 = 945;

/// Needle offset from the origin for the `on` / `off` commands (steps).
pub const COMMAND_ON_OFFSET: i16 = 180;
pub const COMMAND_OFF_OFFSET: i16 = -180;

/// Full-scale raw reading of the position dial (12-bit SAADC).
pub const DIAL_RAW_MAX: u16 = 4095;

/// Delay between steps while driving the needle against the zero stop (µs).
pub const X25_ZERO_STEP_US: u32 = 800;

// Control loop

/// Control loop period (ms). One gauge step per tick bounds the needle speed.
pub const TICK_PERIOD_MS: u64 = 10;

/// Connected-state display refresh cadence, in ticks.
pub const DISPLAY_REFRESH_TICKS: u8 = 10;

// Display (SSD1306 128×32 over I²C)

/// 7-bit I²C address of the OLED.
pub const DISPLAY_I2C_ADDRESS: u8 = 0x3C;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; the actual `embassy_nrf::peripherals::*` are
// picked in `main.rs`.  Adjust for your custom PCB.
//
//   X25 coil A1..B2 → P1.01, P1.02, P1.03, P1.04
//   Reset button    → P0.11 (active-low, internal pull-up)
//   Position dial   → P0.03 / AIN1
//   I²C SDA         → P0.26
//   I²C SCL         → P0.27

/// Tunables of the gauge and control loop.
///
/// The firmware uses [`GaugeConfig::DEFAULT`]; tests shrink the travel so
/// clamping and cadence are easy to reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GaugeConfig {
    /// Steps of travel; positions live in `[0, steps - 1]`.
    pub steps: u16,
    /// Rest position used at start-up and by the reset button.
    pub origin: u16,
    /// Offset from `origin` while the peripheral says `on`.
    pub on_offset: i16,
    /// Offset from `origin` while the peripheral says `off`.
    pub off_offset: i16,
    /// Raw dial reading that maps to the last step.
    pub dial_max: u16,
    /// Ticks between display refreshes while connected.
    pub display_cadence: u8,
}

impl GaugeConfig {
    pub const DEFAULT: Self = Self {
        steps: GAUGE_STEPS,
        origin: GAUGE_STEPS / 2,
        on_offset: COMMAND_ON_OFFSET,
        off_offset: COMMAND_OFF_OFFSET,
        dial_max: DIAL_RAW_MAX,
        display_cadence: DISPLAY_REFRESH_TICKS,
    };

    /// Last reachable step.
    pub const fn max_step(&self) -> u16 {
        self.steps.saturating_sub(1)
    }

    /// Target for a command, or `None` while waiting for one.
    pub fn command_target(&self, status: CommandStatus) -> Option<i32> {
        let offset = match status {
            CommandStatus::Waiting => return None,
            CommandStatus::On => self.on_offset,
            CommandStatus::Off => self.off_offset,
        };
        Some(i32::from(self.origin) + i32::from(offset))
    }

    /// Map a raw dial reading linearly onto `[0, max_step]`.
    pub fn dial_target(&self, raw: u16) -> i32 {
        if self.dial_max == 0 {
            return 0;
        }
        let raw = u32::from(raw.min(self.dial_max));
        (raw * u32::from(self.max_step()) / u32::from(self.dial_max)) as i32
    }
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
