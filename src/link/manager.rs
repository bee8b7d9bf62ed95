//! Connection manager - discovery, connect, subscribe.
//!
//! Owned by the control loop. Discovery runs asynchronously inside the radio;
//! the connect itself is awaited by the loop, one attempt per request and no
//! retries.  After a failure the link rests in `Disconnected` until a rescan
//! is requested (link loss) or the operator presses reset.

use uuid::Uuid;

use crate::config::READ_BUFFER_LEN;
use crate::error::Error;
use crate::link::radio::{Characteristic, Radio};
use crate::link::{PeripheralIdentity, SharedLink};

pub struct LinkManager<'a, R: Radio> {
    shared: &'a SharedLink,
    radio: R,
    characteristic: Uuid,
    att_mtu: u16,
}

impl<'a, R: Radio> LinkManager<'a, R> {
    /// `characteristic` is the command characteristic inside the matched
    /// service; `att_mtu` is requested right after connecting.
    pub fn new(shared: &'a SharedLink, radio: R, characteristic: Uuid, att_mtu: u16) -> Self {
        Self {
            shared,
            radio,
            characteristic,
            att_mtu,
        }
    }

    pub fn shared(&self) -> &'a SharedLink {
        self.shared
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Begin scanning for a peripheral advertising `service`.
    ///
    /// Any stale pending peer is dropped; the first match moves the link to
    /// `ConnectRequested`.
    pub fn start_discovery(&mut self, service: &Uuid) {
        info!("BLE scan starting");
        self.shared.begin_scan();
        self.radio.start_scan(service);
    }

    /// Take the pending connect request, if the scan produced one.
    pub fn take_connect_request(&mut self) -> Option<PeripheralIdentity> {
        self.shared.take_connect_request()
    }

    /// Connect to `peer`, validate the command characteristic and subscribe.
    ///
    /// On success the link is `Connected` with a fresh `Waiting` status.
    /// Any failure leaves the link `Disconnected` with no pending peer.
    pub async fn attempt_connect(&mut self, peer: PeripheralIdentity) -> Result<(), Error> {
        match self.establish(&peer).await {
            Ok(()) => {
                info!("Subscribed to command notifications");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to connect to the BLE server: {}", e);
                self.shared.mark_connect_failed();
                Err(e)
            }
        }
    }

    async fn establish(&mut self, peer: &PeripheralIdentity) -> Result<(), Error> {
        info!("Forming a connection to {}", peer.address);

        // The SoftDevice refuses to initiate while a scan is running.
        self.radio.stop_scan();
        self.radio.connect(peer).await?;
        info!(" - Connected to server");

        if let Err(e) = self.radio.exchange_mtu(self.att_mtu).await {
            warn!("MTU exchange rejected ({}), keeping default", e);
        }

        let result = self.discover_and_subscribe(peer).await;
        if result.is_err() {
            self.radio.disconnect();
        }
        result
    }

    async fn discover_and_subscribe(&mut self, peer: &PeripheralIdentity) -> Result<(), Error> {
        let service = self
            .radio
            .service(&peer.service)
            .await?
            .ok_or(Error::ServiceNotFound)?;
        debug!(" - Found our service");

        let characteristic = self
            .radio
            .characteristic(service, &self.characteristic)
            .await
            .ok_or(Error::CharacteristicNotFound)?;
        debug!(" - Found our characteristic");

        if characteristic.can_read {
            self.log_initial_value(&characteristic).await;
        }

        if !characteristic.can_notify {
            return Err(Error::NotifyUnsupported);
        }

        self.shared.mark_connected();
        self.radio.subscribe(&characteristic).await?;
        Ok(())
    }

    async fn log_initial_value(&mut self, characteristic: &Characteristic) {
        let mut buf = [0u8; READ_BUFFER_LEN];
        match self.radio.read_once(characteristic, &mut buf).await {
            Ok(len) => info!("The characteristic value was: {=[u8]:a}", &buf[..len]),
            Err(e) => warn!("Characteristic read failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandStatus;
    use crate::config::{ATT_MTU, COMMAND_CHAR_UUID, COMMAND_SERVICE_UUID};
    use crate::error::BleError;
    use crate::link::LinkState;
    use crate::testing::{peer, FakeRadio, RadioCall};
    use embassy_futures::block_on;

    fn manager(shared: &SharedLink, radio: FakeRadio) -> LinkManager<'_, FakeRadio> {
        LinkManager::new(shared, radio, COMMAND_CHAR_UUID, ATT_MTU)
    }

    #[test]
    fn discovery_scans_for_the_service() {
        let shared = SharedLink::new();
        let mut link = manager(&shared, FakeRadio::healthy());
        link.start_discovery(&COMMAND_SERVICE_UUID);

        assert_eq!(shared.link_state(), LinkState::ScanRequested);
        assert_eq!(
            link.radio().calls.as_slice(),
            &[RadioCall::StartScan(COMMAND_SERVICE_UUID)]
        );
    }

    #[test]
    fn discovery_drops_stale_peer() {
        let shared = SharedLink::new();
        shared.on_discovered(peer(1));
        let mut link = manager(&shared, FakeRadio::healthy());
        link.start_discovery(&COMMAND_SERVICE_UUID);
        assert!(link.take_connect_request().is_none());
    }

    #[test]
    fn successful_connect_subscribes_and_resets_status() {
        let shared = SharedLink::new();
        shared.set_command_status(CommandStatus::On);
        shared.on_discovered(peer(7));

        let mut link = manager(&shared, FakeRadio::healthy());
        let target = link.take_connect_request().expect("pending peer");
        block_on(link.attempt_connect(target)).expect("connect");

        assert_eq!(shared.link_state(), LinkState::Connected);
        assert_eq!(shared.command_status(), CommandStatus::Waiting);
        assert_eq!(
            link.radio().calls.as_slice(),
            &[
                RadioCall::StopScan,
                RadioCall::Connect(peer(7)),
                RadioCall::ExchangeMtu(517),
                RadioCall::Service(COMMAND_SERVICE_UUID),
                RadioCall::Characteristic(COMMAND_CHAR_UUID),
                RadioCall::ReadOnce,
                RadioCall::Subscribe,
            ]
        );
    }

    #[test]
    fn missing_service_disconnects_and_clears_pending() {
        let shared = SharedLink::new();
        shared.on_discovered(peer(2));
        assert_eq!(shared.link_state(), LinkState::ConnectRequested);

        let mut radio = FakeRadio::healthy();
        radio.service_present = false;
        let mut link = manager(&shared, radio);

        let target = link.take_connect_request().expect("pending peer");
        let result = block_on(link.attempt_connect(target));

        assert_eq!(result, Err(Error::ServiceNotFound));
        assert_eq!(shared.link_state(), LinkState::Disconnected);
        assert!(shared.pending_peer().is_none());
        assert_eq!(link.radio().calls.last(), Some(&RadioCall::Disconnect));
        assert!(!shared.take_rescan_request());
    }

    #[test]
    fn discovery_failure_disconnects() {
        let shared = SharedLink::new();
        shared.on_discovered(peer(9));
        let mut radio = FakeRadio::healthy();
        radio.service_error = Some(BleError::DiscoveryFailed);
        let mut link = manager(&shared, radio);

        let target = link.take_connect_request().expect("pending peer");
        let result = block_on(link.attempt_connect(target));

        assert_eq!(result, Err(Error::Ble(BleError::DiscoveryFailed)));
        assert_eq!(shared.link_state(), LinkState::Disconnected);
        assert!(shared.pending_peer().is_none());
        assert!(!link.radio().calls.contains(&RadioCall::Characteristic(COMMAND_CHAR_UUID)));
        assert_eq!(link.radio().calls.last(), Some(&RadioCall::Disconnect));
    }

    #[test]
    fn missing_characteristic_disconnects() {
        let shared = SharedLink::new();
        let mut radio = FakeRadio::healthy();
        radio.characteristic = None;
        let mut link = manager(&shared, radio);

        let result = block_on(link.attempt_connect(peer(3)));

        assert_eq!(result, Err(Error::CharacteristicNotFound));
        assert_eq!(shared.link_state(), LinkState::Disconnected);
        assert_eq!(link.radio().calls.last(), Some(&RadioCall::Disconnect));
    }

    #[test]
    fn characteristic_without_notify_is_rejected() {
        let shared = SharedLink::new();
        let mut radio = FakeRadio::healthy();
        radio.characteristic = Some(Characteristic {
            value_handle: 0x2a,
            can_read: false,
            can_notify: false,
        });
        let mut link = manager(&shared, radio);

        let result = block_on(link.attempt_connect(peer(3)));

        assert_eq!(result, Err(Error::NotifyUnsupported));
        assert_eq!(shared.link_state(), LinkState::Disconnected);
        assert!(!link.radio().calls.contains(&RadioCall::ReadOnce));
        assert!(!link.radio().calls.contains(&RadioCall::Subscribe));
    }

    #[test]
    fn transport_failure_skips_disconnect() {
        let shared = SharedLink::new();
        let mut radio = FakeRadio::healthy();
        radio.connect_result = Err(BleError::ConnectFailed);
        let mut link = manager(&shared, radio);

        let result = block_on(link.attempt_connect(peer(4)));

        assert_eq!(result, Err(Error::Ble(BleError::ConnectFailed)));
        assert_eq!(shared.link_state(), LinkState::Disconnected);
        assert!(!link.radio().calls.contains(&RadioCall::Disconnect));
    }

    #[test]
    fn mtu_rejection_is_not_fatal() {
        let shared = SharedLink::new();
        let mut radio = FakeRadio::healthy();
        radio.mtu_result = Err(BleError::MtuExchangeFailed);
        let mut link = manager(&shared, radio);

        assert_eq!(block_on(link.attempt_connect(peer(5))), Ok(()));
        assert_eq!(shared.link_state(), LinkState::Connected);
    }

    #[test]
    fn subscribe_failure_leaves_disconnected() {
        let shared = SharedLink::new();
        let mut radio = FakeRadio::healthy();
        radio.subscribe_result = Err(BleError::NotifyFailed);
        let mut link = manager(&shared, radio);

        let result = block_on(link.attempt_connect(peer(6)));

        assert_eq!(result, Err(Error::Ble(BleError::NotifyFailed)));
        assert_eq!(shared.link_state(), LinkState::Disconnected);
        assert_eq!(link.radio().calls.last(), Some(&RadioCall::Disconnect));
    }

    #[test]
    fn read_failure_does_not_abort_connect() {
        let shared = SharedLink::new();
        let mut radio = FakeRadio::healthy();
        radio.read_result = Err(BleError::ReadFailed);
        let mut link = manager(&shared, radio);

        assert_eq!(block_on(link.attempt_connect(peer(8))), Ok(()));
        assert_eq!(shared.link_state(), LinkState::Connected);
    }
}
