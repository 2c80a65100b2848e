//! Hardware Facade: the capability surface of a USB device peripheral.
//!
//! The engine never touches registers. Everything it needs from the chip
//! goes through [`UsbPeripheral`], which the firmware implements over the
//! real peripheral and the tests implement in memory.
//!
//! The model is a FIFO-per-endpoint controller: bytes are pushed into or
//! pulled out of an endpoint bank one at a time, and a bank is handed to
//! the hardware with [`UsbPeripheral::commit_in`] /
//! [`UsbPeripheral::release_out`]. Conditions are exposed as [`Flag`]s that
//! can be tested, cleared and individually enabled as interrupt sources.

use crate::error::{HardwareError, UsbError};
pub use hidpad_proto::Direction;

/// Transfer types the engine configures. Bulk and isochronous endpoints are
/// never used by this device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferType {
    Control,
    Interrupt,
}

/// Parameters of one endpoint, applied as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointConfig {
    pub number: u8,
    pub direction: Direction,
    pub transfer_type: TransferType,
    pub max_packet_size: u16,
    pub bank_count: u8,
}

impl EndpointConfig {
    /// Control endpoint 0 with the given packet size and a single bank.
    #[must_use]
    pub const fn control(max_packet_size: u8) -> Self {
        Self {
            number: 0,
            direction: Direction::Out,
            transfer_type: TransferType::Control,
            max_packet_size: max_packet_size as u16,
            bank_count: 1,
        }
    }

    /// Endpoint address as it appears in descriptors and `wIndex`.
    #[inline]
    #[must_use]
    pub const fn address(&self) -> u8 {
        match self.direction {
            Direction::In => self.number | 0x80,
            Direction::Out => self.number,
        }
    }
}

/// Interrupt/status conditions of the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flag {
    /// VBUS level changed.
    Vbus,
    /// The host finished signalling a bus reset.
    EndOfReset,
    /// A SETUP packet is waiting in the endpoint's FIFO.
    SetupReceived(u8),
    /// The endpoint's IN bank is free and can take new data.
    InReady(u8),
    /// An OUT packet is waiting in the endpoint's FIFO.
    OutReceived(u8),
}

/// USB device peripheral as seen by the protocol engine.
///
/// Implementations must be cheap: every method is called from interrupt
/// context and none of them may block.
pub trait UsbPeripheral {
    /// Power the pad regulator and controller and unfreeze its clock.
    fn enable(&mut self);

    /// Turn the controller off.
    fn disable(&mut self);

    /// Connect to the bus (enable the D+ pull-up).
    fn attach(&mut self);

    /// Disconnect from the bus.
    fn detach(&mut self);

    /// Current VBUS level.
    fn vbus_present(&self) -> bool;

    /// Enable an endpoint and allocate its banks.
    fn configure_endpoint(&mut self, config: &EndpointConfig) -> Result<(), HardwareError>;

    /// Disable an endpoint and release its banks.
    fn disable_endpoint(&mut self, number: u8);

    /// Flush the endpoint's FIFO and reset its data toggle.
    fn reset_endpoint(&mut self, number: u8);

    /// Pop one byte from the endpoint's receive FIFO.
    fn read_byte(&mut self, endpoint: u8) -> u8;

    /// Push one byte into the endpoint's transmit FIFO.
    fn write_byte(&mut self, endpoint: u8, byte: u8);

    /// Hand the IN bank to the hardware. An empty bank sends a zero-length
    /// packet.
    fn commit_in(&mut self, endpoint: u8);

    /// Give the OUT bank back to the hardware so it can receive again.
    fn release_out(&mut self, endpoint: u8);

    fn flag(&self, flag: Flag) -> bool;

    fn clear_flag(&mut self, flag: Flag);

    /// Enable or disable a flag as an interrupt source.
    fn set_interrupt(&mut self, flag: Flag, enabled: bool);

    fn interrupt_enabled(&self, flag: Flag) -> bool;

    /// Answer the next transaction on the endpoint with STALL.
    fn stall(&mut self, endpoint: u8);

    fn clear_stall(&mut self, endpoint: u8);

    fn is_stalled(&self, endpoint: u8) -> bool;

    /// Load and enable the device address.
    fn set_address(&mut self, address: u8);
}

/// Fully reset and reconfigure an endpoint.
///
/// Disables, flushes and only then reconfigures, so a re-applied
/// configuration never inherits stale FIFO contents.
pub fn activate_endpoint<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EndpointConfig,
) -> Result<(), HardwareError> {
    hw.disable_endpoint(config.number);
    hw.reset_endpoint(config.number);
    hw.configure_endpoint(config)
}

/// Poll a flag until it is raised or `limit` polls have gone by.
pub fn wait_for<P: UsbPeripheral + ?Sized>(
    hw: &P,
    flag: Flag,
    limit: u32,
    endpoint: u8,
) -> Result<(), UsbError> {
    for _ in 0..limit {
        if hw.flag(flag) {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(UsbError::Timeout { endpoint })
}
