//! Bluetooth Low Energy link to the command peripheral.
//!
//! The radio runs in **Central** role:
//!
//! 1. **Discovery** - scan for a peripheral advertising the command service;
//!    the first match stops the scan and becomes the pending peer.
//! 2. **Connection** - the control loop dispatches the pending connect,
//!    checks the service / characteristic and subscribes to notifications.
//! 3. **Link loss** - a disconnect resets the commanded status and raises a
//!    rescan request for the control loop.
//!
//! Radio events arrive from contexts other than the control loop, so
//! everything they touch lives in [`SharedLink`]: small atomics plus a
//! critical-section guarded slot for the pending peer.

pub mod adv_parser;
pub mod manager;
pub mod radio;
#[cfg(feature = "embedded")]
pub mod softdevice;

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use uuid::Uuid;

use crate::command::CommandStatus;
pub use manager::LinkManager;
pub use radio::{Characteristic, Radio, ServiceHandle};

/// Kind of BLE device address (mirrors the SoftDevice address types).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    Public,
    RandomStatic,
    RandomPrivateResolvable,
    RandomPrivateNonResolvable,
    Anonymous,
}

/// A peripheral found advertising the service we filter on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeripheralIdentity {
    /// BLE address, little-endian as reported by the controller.
    pub address: [u8; 6],
    pub kind: AddressKind,
    /// Service UUID the advertisement matched.
    pub service: Uuid,
}

#[cfg(feature = "defmt")]
impl defmt::Format for PeripheralIdentity {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "PeripheralIdentity {{ address: {:x}, kind: {}, service: {=u128:x} }}",
            self.address,
            self.kind,
            self.service.as_u128()
        )
    }
}

/// Connection state of the single link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LinkState {
    /// Nothing running; waiting for the operator or a rescan request.
    #[default]
    Idle = 0,
    /// A scan is in progress.
    ScanRequested = 1,
    /// A peripheral was found and waits for the control loop to connect.
    ConnectRequested = 2,
    /// Link up, subscription established or being established.
    Connected = 3,
    /// The link dropped or the last connect failed.
    Disconnected = 4,
}

impl LinkState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LinkState::ScanRequested,
            2 => LinkState::ConnectRequested,
            3 => LinkState::Connected,
            4 => LinkState::Disconnected,
            _ => LinkState::Idle,
        }
    }
}

/// Link and command state shared between radio callbacks and the control loop.
///
/// Every method is non-blocking and safe to call from any execution context.
pub struct SharedLink {
    link: AtomicU8,
    command: AtomicU8,
    rescan: AtomicBool,
    /// Set once the pending peer has been handed to the control loop.
    dispatched: AtomicBool,
    pending: Mutex<CriticalSectionRawMutex, Cell<Option<PeripheralIdentity>>>,
}

impl SharedLink {
    pub const fn new() -> Self {
        Self {
            link: AtomicU8::new(LinkState::Idle as u8),
            command: AtomicU8::new(CommandStatus::Waiting as u8),
            rescan: AtomicBool::new(false),
            dispatched: AtomicBool::new(false),
            pending: Mutex::new(Cell::new(None)),
        }
    }

    pub fn link_state(&self) -> LinkState {
        LinkState::from_u8(self.link.load(Ordering::Acquire))
    }

    pub fn command_status(&self) -> CommandStatus {
        CommandStatus::from_u8(self.command.load(Ordering::Acquire))
    }

    pub fn set_command_status(&self, status: CommandStatus) {
        self.command.store(status as u8, Ordering::Release);
    }

    /// Peer currently waiting for, or going through, a connect attempt.
    pub fn pending_peer(&self) -> Option<PeripheralIdentity> {
        self.pending.lock(|slot| slot.get())
    }

    /// Scan callback: a peripheral advertising our service was seen.
    ///
    /// Returns `true` when the match was accepted and the scan must stop.
    /// The first match wins; later ones are ignored until the request is
    /// consumed.
    pub fn on_discovered(&self, peer: PeripheralIdentity) -> bool {
        self.pending.lock(|slot| {
            match self.link_state() {
                LinkState::ConnectRequested | LinkState::Connected => false,
                _ => {
                    slot.set(Some(peer));
                    self.dispatched.store(false, Ordering::Release);
                    self.store_link(LinkState::ConnectRequested);
                    true
                }
            }
        })
    }

    /// Scan callback: the scan window closed without a match.
    pub fn on_scan_ended(&self) {
        let _ = self.link.compare_exchange(
            LinkState::ScanRequested as u8,
            LinkState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Radio callback: the link dropped, whatever the loop was doing.
    pub fn on_disconnect(&self) {
        self.pending.lock(|slot| {
            self.clear_pending(slot);
            self.set_command_status(CommandStatus::Waiting);
            self.store_link(LinkState::Disconnected);
        });
        self.rescan.store(true, Ordering::Release);
    }

    /// Consume the rescan request raised by the last disconnect.
    pub fn take_rescan_request(&self) -> bool {
        self.rescan.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn begin_scan(&self) {
        self.pending.lock(|slot| {
            self.clear_pending(slot);
            self.store_link(LinkState::ScanRequested);
        });
    }

    /// Hand out the pending peer for a connect attempt, once per match.
    ///
    /// The peer stays in the slot and the link stays `ConnectRequested`
    /// until the attempt resolves through [`Self::mark_connected`] or
    /// [`Self::mark_connect_failed`].
    pub(crate) fn take_connect_request(&self) -> Option<PeripheralIdentity> {
        self.pending.lock(|slot| {
            let peer = slot.get()?;
            if self.dispatched.swap(true, Ordering::AcqRel) {
                return None;
            }
            Some(peer)
        })
    }

    /// A rescan raised by an earlier disconnect is void once a new link is up.
    pub(crate) fn mark_connected(&self) {
        self.pending.lock(|slot| {
            self.clear_pending(slot);
            self.rescan.store(false, Ordering::Release);
            self.set_command_status(CommandStatus::Waiting);
            self.store_link(LinkState::Connected);
        });
    }

    pub(crate) fn mark_connect_failed(&self) {
        self.pending.lock(|slot| {
            self.clear_pending(slot);
            self.store_link(LinkState::Disconnected);
        });
    }

    fn clear_pending(&self, slot: &Cell<Option<PeripheralIdentity>>) {
        slot.set(None);
        self.dispatched.store(false, Ordering::Release);
    }

    fn store_link(&self, state: LinkState) {
        self.link.store(state as u8, Ordering::Release);
    }
}

impl Default for SharedLink {
    fn default() -> Self {
        Self::new()
    }
}
