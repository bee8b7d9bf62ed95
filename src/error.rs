//! Unified error type for gaugelink.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// The radio stack reported a failure.
    Ble(BleError),

    /// The connected peripheral does not expose the command service.
    ServiceNotFound,

    /// The command characteristic was not found inside the service.
    CharacteristicNotFound,

    /// The command characteristic cannot notify, so nothing would ever arrive.
    NotifyUnsupported,

    // UI / Display
    /// The OLED did not answer during initialisation. Fatal.
    DisplayInit,

    /// I²C transaction to the display failed after initialisation.
    Display,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// Scan was cancelled or could not start.
    ScanFailed,
    /// Connection attempt failed.
    ConnectFailed,
    /// The operation needs a link and there is none.
    NotConnected,
    /// GATT discovery failed for a reason other than a missing service.
    DiscoveryFailed,
    /// ATT MTU exchange was rejected.
    MtuExchangeFailed,
    /// Characteristic read failed.
    ReadFailed,
    /// Characteristic subscribe/notify failed.
    NotifyFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}
