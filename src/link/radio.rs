//! Narrow interface to the radio stack.
//!
//! [`LinkManager`](super::LinkManager) drives connections through this trait;
//! the firmware implements it on top of the Nordic SoftDevice and tests use
//! scripted fakes.  Asynchronous radio events (scan match, scan end,
//! notification, disconnect) do not go through the trait: implementations
//! report them straight into [`SharedLink`](super::SharedLink).

use uuid::Uuid;

use crate::error::BleError;
use crate::link::PeripheralIdentity;

/// Opaque handle of a discovered GATT service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceHandle(pub u16);

/// A discovered GATT characteristic and the properties we care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Characteristic {
    pub value_handle: u16,
    pub can_read: bool,
    pub can_notify: bool,
}

#[allow(async_fn_in_trait)]
pub trait Radio {
    /// Start an asynchronous scan for peripherals advertising `service`.
    ///
    /// Matches go to `SharedLink::on_discovered`, which also decides whether
    /// the scan stops; a window that closes empty ends in
    /// `SharedLink::on_scan_ended`.
    fn start_scan(&mut self, service: &Uuid);

    /// Cancel a running scan. No-op when none is running.
    fn stop_scan(&mut self);

    /// Establish the transport link.
    async fn connect(&mut self, peer: &PeripheralIdentity) -> Result<(), BleError>;

    /// Ask the peer for a larger ATT MTU.
    async fn exchange_mtu(&mut self, mtu: u16) -> Result<(), BleError>;

    /// Look up a primary service on the connected peer.
    ///
    /// `Ok(None)` means the peer does not have it; `Err` means discovery
    /// itself failed.
    async fn service(&mut self, uuid: &Uuid) -> Result<Option<ServiceHandle>, BleError>;

    /// Look up a characteristic inside a discovered service.
    async fn characteristic(
        &mut self,
        service: ServiceHandle,
        uuid: &Uuid,
    ) -> Option<Characteristic>;

    /// Read the characteristic value once; returns the number of bytes copied.
    async fn read_once(
        &mut self,
        characteristic: &Characteristic,
        buf: &mut [u8],
    ) -> Result<usize, BleError>;

    /// Enable notifications. From here on payloads are delivered to
    /// `command::apply` and link loss to `SharedLink::on_disconnect`.
    async fn subscribe(&mut self, characteristic: &Characteristic) -> Result<(), BleError>;

    /// Drop the link. Does not raise `on_disconnect`.
    fn disconnect(&mut self);
}
