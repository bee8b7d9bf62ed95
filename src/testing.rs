//! Host-side fakes for the hardware traits.

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use uuid::Uuid;

use crate::config::COMMAND_SERVICE_UUID;
use crate::error::{BleError, Error};
use crate::gauge::{Direction, StepperMotor};
use crate::link::radio::{Characteristic, Radio, ServiceHandle};
use crate::link::{AddressKind, PeripheralIdentity};
use crate::ui::{InputPanel, ManualInput, TextSurface};

pub(crate) fn peer(last: u8) -> PeripheralIdentity {
    PeripheralIdentity {
        address: [0x11, 0x22, 0x33, 0x44, 0x55, last],
        kind: AddressKind::RandomStatic,
        service: COMMAND_SERVICE_UUID,
    }
}

// Radio

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RadioCall {
    StartScan(Uuid),
    StopScan,
    Connect(PeripheralIdentity),
    ExchangeMtu(u16),
    Service(Uuid),
    Characteristic(Uuid),
    ReadOnce,
    Subscribe,
    Disconnect,
}

pub(crate) struct FakeRadio {
    pub calls: Vec<RadioCall>,
    pub connect_result: Result<(), BleError>,
    pub mtu_result: Result<(), BleError>,
    pub service_present: bool,
    pub service_error: Option<BleError>,
    pub characteristic: Option<Characteristic>,
    pub read_result: Result<&'static [u8], BleError>,
    pub subscribe_result: Result<(), BleError>,
}

impl FakeRadio {
    /// A peripheral that exposes a readable, notifying command characteristic.
    pub fn healthy() -> Self {
        Self {
            calls: Vec::new(),
            connect_result: Ok(()),
            mtu_result: Ok(()),
            service_present: true,
            service_error: None,
            characteristic: Some(Characteristic {
                value_handle: 0x2a,
                can_read: true,
                can_notify: true,
            }),
            read_result: Ok(b"off"),
            subscribe_result: Ok(()),
        }
    }

    pub fn count(&self, call: &RadioCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Radio for FakeRadio {
    fn start_scan(&mut self, service: &Uuid) {
        self.calls.push(RadioCall::StartScan(*service));
    }

    fn stop_scan(&mut self) {
        self.calls.push(RadioCall::StopScan);
    }

    async fn connect(&mut self, peer: &PeripheralIdentity) -> Result<(), BleError> {
        self.calls.push(RadioCall::Connect(*peer));
        self.connect_result
    }

    async fn exchange_mtu(&mut self, mtu: u16) -> Result<(), BleError> {
        self.calls.push(RadioCall::ExchangeMtu(mtu));
        self.mtu_result
    }

    async fn service(&mut self, uuid: &Uuid) -> Result<Option<ServiceHandle>, BleError> {
        self.calls.push(RadioCall::Service(*uuid));
        if let Some(e) = self.service_error {
            return Err(e);
        }
        Ok(self.service_present.then_some(ServiceHandle(0x10)))
    }

    async fn characteristic(
        &mut self,
        _service: ServiceHandle,
        uuid: &Uuid,
    ) -> Option<Characteristic> {
        self.calls.push(RadioCall::Characteristic(*uuid));
        self.characteristic
    }

    async fn read_once(
        &mut self,
        _characteristic: &Characteristic,
        buf: &mut [u8],
    ) -> Result<usize, BleError> {
        self.calls.push(RadioCall::ReadOnce);
        let value = self.read_result?;
        let len = value.len().min(buf.len());
        buf[..len].copy_from_slice(&value[..len]);
        Ok(len)
    }

    async fn subscribe(&mut self, _characteristic: &Characteristic) -> Result<(), BleError> {
        self.calls.push(RadioCall::Subscribe);
        self.subscribe_result
    }

    fn disconnect(&mut self) {
        self.calls.push(RadioCall::Disconnect);
    }
}

// Stepper

#[derive(Default)]
pub(crate) struct FakeMotor {
    pub zeroed: u32,
    pub steps: Vec<Direction>,
    /// Physical needle position, tracked independently of `Gauge`.
    pub position: i32,
}

impl StepperMotor for FakeMotor {
    fn zero(&mut self) {
        self.zeroed += 1;
        self.position = 0;
    }

    fn step(&mut self, direction: Direction) {
        self.steps.push(direction);
        self.position += match direction {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };
    }
}

// Display

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceOp {
    Clear,
    Cursor(i32, i32),
    Text(String),
    Present,
}

#[derive(Default)]
pub(crate) struct RecordingSurface {
    pub ops: Vec<SurfaceOp>,
    pub fail_present: bool,
}

impl RecordingSurface {
    /// Ops grouped per presented frame.
    pub fn frames(&self) -> Vec<Vec<SurfaceOp>> {
        self.ops
            .split_inclusive(|op| *op == SurfaceOp::Present)
            .filter(|frame| frame.last() == Some(&SurfaceOp::Present))
            .map(<[SurfaceOp]>::to_vec)
            .collect()
    }

    pub fn presents(&self) -> usize {
        self.ops.iter().filter(|op| **op == SurfaceOp::Present).count()
    }

    /// Text of the last presented frame.
    pub fn last_texts(&self) -> Vec<String> {
        self.frames()
            .last()
            .map(|frame| {
                frame
                    .iter()
                    .filter_map(|op| match op {
                        SurfaceOp::Text(t) => Some(t.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TextSurface for RecordingSurface {
    fn clear(&mut self) {
        self.ops.push(SurfaceOp::Clear);
    }

    fn set_cursor(&mut self, x: i32, y: i32) {
        self.ops.push(SurfaceOp::Cursor(x, y));
    }

    fn write_text(&mut self, text: &str) {
        self.ops.push(SurfaceOp::Text(text.into()));
    }

    fn present(&mut self) -> Result<(), Error> {
        self.ops.push(SurfaceOp::Present);
        if self.fail_present {
            Err(Error::Display)
        } else {
            Ok(())
        }
    }
}

// Inputs

/// Replays queued samples; once drained, repeats `idle`.
#[derive(Default)]
pub(crate) struct ScriptedInputs {
    pub queue: VecDeque<ManualInput>,
    pub idle: ManualInput,
}

impl ScriptedInputs {
    pub fn push(&mut self, input: ManualInput) {
        self.queue.push_back(input);
    }
}

impl InputPanel for ScriptedInputs {
    async fn sample(&mut self) -> ManualInput {
        self.queue.pop_front().unwrap_or(self.idle)
    }
}
