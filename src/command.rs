//! Command interpreter - turns notification payloads into the desired
//! gauge status.
//!
//! The remote peripheral writes plain text: `on` or `off`.  Anything else is
//! noise and keeps the last good command; only a disconnect brings the status
//! back to [`CommandStatus::Waiting`].

use crate::link::SharedLink;

/// Token that selects [`CommandStatus::On`].
pub const TOKEN_ON: &str = "on";

/// Token that selects [`CommandStatus::Off`].
pub const TOKEN_OFF: &str = "off";

/// Desired gauge status, as last commanded by the peripheral.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandStatus {
    /// No command since the link came up.
    #[default]
    Waiting = 0,
    On = 1,
    Off = 2,
}

impl CommandStatus {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => CommandStatus::On,
            2 => CommandStatus::Off,
            _ => CommandStatus::Waiting,
        }
    }
}

/// Decode a notification payload.
///
/// Returns `None` for anything that is not a known token (empty, non-UTF-8,
/// unknown words); the caller must then leave the current status alone.
/// Surrounding ASCII whitespace and trailing NUL padding are ignored.
pub fn decode(payload: &[u8]) -> Option<CommandStatus> {
    let text = core::str::from_utf8(payload).ok()?;
    match text.trim_end_matches('\0').trim_ascii() {
        TOKEN_ON => Some(CommandStatus::On),
        TOKEN_OFF => Some(CommandStatus::Off),
        _ => None,
    }
}

/// Decode `payload` and store a recognised command in `shared`.
///
/// Runs in the radio's notification context: no blocking, no radio calls.
pub fn apply(shared: &SharedLink, payload: &[u8]) -> Option<CommandStatus> {
    match decode(payload) {
        Some(status) => {
            info!("Received command: {}", status);
            shared.set_command_status(status);
            Some(status)
        }
        None => {
            warn!("Received unknown data ({} bytes)", payload.len());
            None
        }
    }
}
