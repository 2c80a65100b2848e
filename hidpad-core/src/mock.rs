//! In-memory peripheral for engine tests.
//!
//! Behaves like an ideal host: every committed IN bank is consumed at once
//! and the bank is free again, unless a test marks it busy.

extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use hidpad_proto::{GamepadState, SetupPacket};

use crate::error::HardwareError;
use crate::input::InputSource;
use crate::peripheral::{EndpointConfig, Flag, UsbPeripheral};

const ENDPOINTS: usize = 2;

/// Operations that matter for ordering assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Enable,
    Disable,
    Attach,
    Detach,
    ConfigureEndpoint(EndpointConfig),
    DisableEndpoint(u8),
    ResetEndpoint(u8),
    CommitIn(u8),
    ReleaseOut(u8),
    SetInterrupt(Flag, bool),
    Stall(u8),
    ClearStall(u8),
    SetAddress(u8),
}

#[derive(Debug, Default)]
pub struct MockPeripheral {
    pub ops: Vec<Op>,
    /// Committed IN packets, in order, with their endpoint.
    pub sent: Vec<(u8, Vec<u8>)>,
    pub rx: VecDeque<u8>,
    pub vbus: bool,
    pub vbus_changed: bool,
    pub end_of_reset: bool,
    pub setup_received: bool,
    pub out_received: bool,
    /// Endpoint 0 IN bank never frees.
    pub in_bank_busy: bool,
    /// Report endpoint IN bank never frees.
    pub report_bank_busy: bool,
    /// Raise `OutReceived(0)` once this many packets went out on endpoint 0.
    pub abort_after: Option<usize>,
    /// Remaining configuration attempts to reject, per endpoint.
    pub reject_configure: [u8; ENDPOINTS],
    pub configured: [Option<EndpointConfig>; ENDPOINTS],
    pub stalled: [bool; ENDPOINTS],
    pub interrupts: Vec<Flag>,
    pub address: u8,
    pub enabled: bool,
    pub attached: bool,
    pending: [Vec<u8>; ENDPOINTS],
}

impl MockPeripheral {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a SETUP packet in the endpoint 0 FIFO.
    pub fn queue_setup(&mut self, setup: SetupPacket) {
        self.rx.clear();
        self.rx.extend(setup.to_bytes());
        self.setup_received = true;
    }

    /// Packets committed on one endpoint.
    pub fn packets(&self, endpoint: u8) -> Vec<Vec<u8>> {
        self.sent
            .iter()
            .filter(|(ep, _)| *ep == endpoint)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// All bytes committed on endpoint 0, reassembled.
    pub fn control_data(&self) -> Vec<u8> {
        self.packets(0).concat()
    }

    pub fn position(&self, op: &Op) -> Option<usize> {
        self.ops.iter().position(|o| o == op)
    }

    pub fn clear_log(&mut self) {
        self.ops.clear();
        self.sent.clear();
    }

    fn slot(endpoint: u8) -> usize {
        usize::from(endpoint) % ENDPOINTS
    }
}

impl UsbPeripheral for MockPeripheral {
    fn enable(&mut self) {
        self.enabled = true;
        self.ops.push(Op::Enable);
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.ops.push(Op::Disable);
    }

    fn attach(&mut self) {
        self.attached = true;
        self.ops.push(Op::Attach);
    }

    fn detach(&mut self) {
        self.attached = false;
        self.ops.push(Op::Detach);
    }

    fn vbus_present(&self) -> bool {
        self.vbus
    }

    fn configure_endpoint(&mut self, config: &EndpointConfig) -> Result<(), HardwareError> {
        self.ops.push(Op::ConfigureEndpoint(*config));
        let slot = Self::slot(config.number);
        if self.reject_configure[slot] > 0 {
            self.reject_configure[slot] -= 1;
            return Err(HardwareError::EndpointConfig {
                endpoint: config.number,
            });
        }
        self.configured[slot] = Some(*config);
        Ok(())
    }

    fn disable_endpoint(&mut self, number: u8) {
        self.configured[Self::slot(number)] = None;
        self.ops.push(Op::DisableEndpoint(number));
    }

    fn reset_endpoint(&mut self, number: u8) {
        self.pending[Self::slot(number)].clear();
        self.ops.push(Op::ResetEndpoint(number));
    }

    fn read_byte(&mut self, _endpoint: u8) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }

    fn write_byte(&mut self, endpoint: u8, byte: u8) {
        self.pending[Self::slot(endpoint)].push(byte);
    }

    fn commit_in(&mut self, endpoint: u8) {
        let data = core::mem::take(&mut self.pending[Self::slot(endpoint)]);
        self.sent.push((endpoint, data));
        self.ops.push(Op::CommitIn(endpoint));
        if endpoint == 0 && self.abort_after == Some(self.packets(0).len()) {
            self.out_received = true;
        }
    }

    fn release_out(&mut self, endpoint: u8) {
        self.ops.push(Op::ReleaseOut(endpoint));
    }

    fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::Vbus => self.vbus_changed,
            Flag::EndOfReset => self.end_of_reset,
            Flag::SetupReceived(0) => self.setup_received,
            Flag::OutReceived(0) => self.out_received,
            Flag::InReady(0) => !self.in_bank_busy,
            Flag::InReady(1) => !self.report_bank_busy,
            _ => false,
        }
    }

    fn clear_flag(&mut self, flag: Flag) {
        match flag {
            Flag::Vbus => self.vbus_changed = false,
            Flag::EndOfReset => self.end_of_reset = false,
            Flag::SetupReceived(0) => self.setup_received = false,
            Flag::OutReceived(0) => self.out_received = false,
            _ => {}
        }
    }

    fn set_interrupt(&mut self, flag: Flag, enabled: bool) {
        self.interrupts.retain(|f| *f != flag);
        if enabled {
            self.interrupts.push(flag);
        }
        self.ops.push(Op::SetInterrupt(flag, enabled));
    }

    fn interrupt_enabled(&self, flag: Flag) -> bool {
        self.interrupts.contains(&flag)
    }

    fn stall(&mut self, endpoint: u8) {
        self.stalled[Self::slot(endpoint)] = true;
        self.ops.push(Op::Stall(endpoint));
    }

    fn clear_stall(&mut self, endpoint: u8) {
        self.stalled[Self::slot(endpoint)] = false;
        self.ops.push(Op::ClearStall(endpoint));
    }

    fn is_stalled(&self, endpoint: u8) -> bool {
        self.stalled[Self::slot(endpoint)]
    }

    fn set_address(&mut self, address: u8) {
        self.address = address;
        self.ops.push(Op::SetAddress(address));
    }
}

/// Input source that hands out queued snapshots, then nothing.
#[derive(Debug, Default)]
pub struct MockInput {
    pub queue: VecDeque<GamepadState>,
    pub calls: usize,
}

impl MockInput {
    pub fn push(&mut self, state: GamepadState) {
        self.queue.push_back(state);
    }
}

impl InputSource for MockInput {
    fn sample(&mut self) -> Option<GamepadState> {
        self.calls += 1;
        self.queue.pop_front()
    }
}
