//! [`Radio`] on top of the Nordic SoftDevice (S140, Central role).
//!
//! The SoftDevice reports scan results and notifications through futures
//! that must keep running while the control loop does other work, so two
//! long-lived tasks own them:
//!
//! - [`scan_task`] runs a scan whenever [`SoftdeviceRadio::start_scan`]
//!   asks for one and feeds matches to [`SharedLink::on_discovered`];
//! - [`notification_task`] takes over a connection, enables notifications
//!   while already listening, hands every payload to [`command::apply`] and
//!   reports link loss.

use embassy_futures::join::join;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use nrf_softdevice::ble::gatt_client::{self, DiscoverError};
use nrf_softdevice::ble::{central, Address, AddressType, Connection};
use nrf_softdevice::Softdevice;
use uuid::Uuid;

use crate::command;
use crate::config::{
    BLE_ACTIVE_SCAN, BLE_SCAN_DURATION_SECS, BLE_SCAN_INTERVAL_MS, BLE_SCAN_WINDOW_MS,
    COMMAND_CHAR_UUID, COMMAND_SERVICE_UUID, NOTIFY_PAYLOAD_MAX,
};
use crate::error::BleError;
use crate::link::adv_parser::{advertises_service, extract_device_name};
use crate::link::radio::{Characteristic, Radio, ServiceHandle};
use crate::link::{AddressKind, PeripheralIdentity, SharedLink};

/// GATT client for the command service.
#[nrf_softdevice::gatt_client(uuid = "4fafc201-1fb5-459e-8fcc-c5c9c331914b")]
pub struct GaugeServiceClient {
    /// Plain-text `on` / `off` commands.
    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26a8", read, notify)]
    pub command: heapless::Vec<u8, NOTIFY_PAYLOAD_MAX>,
}

/// A link handed over to [`notification_task`] for subscription.
struct Session {
    conn: Connection,
    client: GaugeServiceClient,
}

static SCAN_REQUEST: Signal<CriticalSectionRawMutex, Uuid> = Signal::new();
static SCAN_CANCEL: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static SESSION: Signal<CriticalSectionRawMutex, Session> = Signal::new();
static SUBSCRIBED: Signal<CriticalSectionRawMutex, Result<(), BleError>> = Signal::new();

/// Handle only ever returned for the single service we know.
const COMMAND_SERVICE_HANDLE: ServiceHandle = ServiceHandle(1);

pub struct SoftdeviceRadio {
    sd: &'static Softdevice,
    conn: Option<Connection>,
    client: Option<GaugeServiceClient>,
}

impl SoftdeviceRadio {
    pub fn new(sd: &'static Softdevice) -> Self {
        Self {
            sd,
            conn: None,
            client: None,
        }
    }
}

impl Radio for SoftdeviceRadio {
    fn start_scan(&mut self, service: &Uuid) {
        SCAN_REQUEST.signal(*service);
    }

    fn stop_scan(&mut self) {
        SCAN_CANCEL.signal(());
    }

    async fn connect(&mut self, peer: &PeripheralIdentity) -> Result<(), BleError> {
        self.client = None;
        let address = Address::new(to_address_type(peer.kind), peer.address);
        let whitelist = [&address];
        let config = central::ConnectConfig {
            scan_config: central::ScanConfig {
                whitelist: Some(&whitelist),
                ..Default::default()
            },
            ..Default::default()
        };

        let conn = central::connect(self.sd, &config)
            .await
            .map_err(|_| BleError::ConnectFailed)?;
        self.conn = Some(conn);
        Ok(())
    }

    async fn exchange_mtu(&mut self, mtu: u16) -> Result<(), BleError> {
        let conn = self.conn.as_ref().ok_or(BleError::NotConnected)?;
        gatt_client::att_mtu_exchange(conn, mtu)
            .await
            .map_err(|_| BleError::MtuExchangeFailed)
    }

    async fn service(&mut self, uuid: &Uuid) -> Result<Option<ServiceHandle>, BleError> {
        if *uuid != COMMAND_SERVICE_UUID {
            return Ok(None);
        }
        let conn = self.conn.as_ref().ok_or(BleError::NotConnected)?;

        // Discovery resolves the service and its characteristic in one pass.
        match gatt_client::discover::<GaugeServiceClient>(conn).await {
            Ok(client) => {
                self.client = Some(client);
                Ok(Some(COMMAND_SERVICE_HANDLE))
            }
            Err(DiscoverError::ServiceNotFound) => Ok(None),
            // The service exists but its characteristic does not.
            Err(DiscoverError::ServiceIncomplete) => {
                self.client = None;
                Ok(Some(COMMAND_SERVICE_HANDLE))
            }
            Err(e) => {
                warn!("GATT discovery failed: {}", e);
                self.client = None;
                Err(BleError::DiscoveryFailed)
            }
        }
    }

    async fn characteristic(
        &mut self,
        service: ServiceHandle,
        uuid: &Uuid,
    ) -> Option<Characteristic> {
        if service != COMMAND_SERVICE_HANDLE || *uuid != COMMAND_CHAR_UUID {
            return None;
        }
        self.client.as_ref().map(|client| Characteristic {
            value_handle: client.command_value_handle,
            can_read: true,
            can_notify: client.command_cccd_handle != 0,
        })
    }

    async fn read_once(
        &mut self,
        _characteristic: &Characteristic,
        buf: &mut [u8],
    ) -> Result<usize, BleError> {
        let client = self.client.as_ref().ok_or(BleError::NotConnected)?;
        let value = client
            .command_read()
            .await
            .map_err(|_| BleError::ReadFailed)?;
        let len = value.len().min(buf.len());
        buf[..len].copy_from_slice(&value[..len]);
        Ok(len)
    }

    async fn subscribe(&mut self, _characteristic: &Characteristic) -> Result<(), BleError> {
        let conn = self.conn.clone().ok_or(BleError::NotConnected)?;
        let client = self.client.take().ok_or(BleError::NotConnected)?;

        // The CCCD write happens inside the notification task so that no
        // notification slips in before it listens.
        SUBSCRIBED.reset();
        SESSION.signal(Session { conn, client });
        SUBSCRIBED.wait().await
    }

    fn disconnect(&mut self) {
        self.client = None;
        if let Some(conn) = self.conn.take() {
            let _ = conn.disconnect();
        }
    }
}

/// Scan worker. Never returns.
pub async fn scan_task(sd: &'static Softdevice, shared: &'static SharedLink) -> ! {
    let config = central::ScanConfig {
        active: BLE_ACTIVE_SCAN,
        interval: ms_to_units_625us(BLE_SCAN_INTERVAL_MS),
        window: ms_to_units_625us(BLE_SCAN_WINDOW_MS),
        // 10 ms units.
        timeout: BLE_SCAN_DURATION_SECS * 100,
        ..Default::default()
    };

    loop {
        let service = SCAN_REQUEST.wait().await;
        SCAN_CANCEL.reset();
        info!("BLE scan starting ({} s window)", BLE_SCAN_DURATION_SECS);

        let scan = central::scan(sd, &config, |params| {
            let data =
                unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };
            if !advertises_service(data, &service) {
                return None;
            }

            let address = Address::from_raw(params.peer_addr);
            info!(
                "BLE Advertised Device found: {} (RSSI {})",
                extract_device_name(data).as_str(),
                params.rssi
            );
            let peer = PeripheralIdentity {
                address: address.bytes(),
                kind: to_address_kind(address.address_type()),
                service,
            };
            shared.on_discovered(peer).then_some(())
        });

        match select(scan, SCAN_CANCEL.wait()).await {
            Either::First(Ok(())) => debug!("BLE scan stopped on match"),
            Either::First(Err(central::ScanError::Timeout)) => {
                info!("BLE scan window closed without a match");
                shared.on_scan_ended();
            }
            Either::First(Err(_)) => {
                warn!("BLE scan ended with error: {}", BleError::ScanFailed);
                shared.on_scan_ended();
            }
            Either::Second(()) => {
                debug!("BLE scan cancelled");
                shared.on_scan_ended();
            }
        }
    }
}

/// Notification worker: subscribes each session and runs it until the link
/// drops.
///
/// The CCCD write is issued while `gatt_client::run` is already polled, and
/// its outcome is reported back to [`SoftdeviceRadio::subscribe`]. Link loss
/// is only reported for sessions whose subscription succeeded; a failed one
/// is torn down by the connect path.
pub async fn notification_task(shared: &'static SharedLink) -> ! {
    loop {
        let Session { conn, client } = SESSION.wait().await;
        info!("Command notification loop started");

        let listen = gatt_client::run(&conn, &client, |event| match event {
            GaugeServiceClientEvent::CommandNotification(data) => {
                command::apply(shared, &data);
            }
        });
        let enable = async {
            let result = client
                .command_cccd_write(true)
                .await
                .map_err(|_| BleError::NotifyFailed);
            SUBSCRIBED.signal(result);
            result
        };

        let (_, subscribed) = join(listen, enable).await;

        if subscribed.is_ok() {
            info!("onDisconnect");
            shared.on_disconnect();
        }
    }
}

fn ms_to_units_625us(ms: u32) -> u32 {
    ms * 1000 / 625
}

fn to_address_kind(kind: AddressType) -> AddressKind {
    match kind {
        AddressType::Public => AddressKind::Public,
        AddressType::RandomStatic => AddressKind::RandomStatic,
        AddressType::RandomPrivateResolvable => AddressKind::RandomPrivateResolvable,
        AddressType::RandomPrivateNonResolvable => AddressKind::RandomPrivateNonResolvable,
        AddressType::Anonymous => AddressKind::Anonymous,
    }
}

fn to_address_type(kind: AddressKind) -> AddressType {
    match kind {
        AddressKind::Public => AddressType::Public,
        AddressKind::RandomStatic => AddressType::RandomStatic,
        AddressKind::RandomPrivateResolvable => AddressType::RandomPrivateResolvable,
        AddressKind::RandomPrivateNonResolvable => AddressType::RandomPrivateNonResolvable,
        AddressKind::Anonymous => AddressType::Anonymous,
    }
}
