//! gaugelink - a BLE-commanded stepper gauge.
//!
//! The firmware scans for a peripheral advertising the command service,
//! subscribes to its command characteristic and turns `on` / `off`
//! notifications into needle positions on an X25 stepper gauge, with link
//! and command status mirrored on a small OLED.
//!
//! Everything except the hardware adapters builds and tests on the host:
//!
//! ```text
//! cargo test                                  # host unit + integration tests
//! cargo build --release --features embedded   # nRF52840 firmware
//! ```
//!
//! The embedded binary (`main.rs`, `#![no_std]` + `#![no_main]`) wires the
//! adapters behind the `embedded` feature into [`control::ControlLoop`].

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible in every module.
mod fmt;

pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod gauge;
pub mod link;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use command::CommandStatus;
pub use error::{BleError, Error};
pub use link::{LinkState, SharedLink};
