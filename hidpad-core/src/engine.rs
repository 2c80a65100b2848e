//! The protocol engine: one state, one dispatch function.

use hidpad_proto::{CONTROL_MAX_PACKET_SIZE, REPORT_MAX_PACKET_SIZE};

use crate::control;
use crate::enumeration::{self, DeviceState, UsbState};
use crate::error::UsbError;
use crate::event::{pending_events, UsbEvent};
use crate::input::InputSource;
use crate::peripheral::{Direction, EndpointConfig, Flag, TransferType, UsbPeripheral};
use crate::report;

/// Compile-time engine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Endpoint 0 packet size; must match `bMaxPacketSize0`.
    pub control_max_packet: u8,
    /// The interrupt IN endpoint carrying gamepad reports.
    pub report_endpoint: EndpointConfig,
    /// Polls of a ready flag before a wait is given up.
    pub poll_limit: u32,
    /// Attempts at activating an endpoint before reporting failure.
    pub configure_attempts: u8,
}

impl EngineConfig {
    pub const DEFAULT: Self = Self {
        control_max_packet: CONTROL_MAX_PACKET_SIZE,
        report_endpoint: EndpointConfig {
            number: 1,
            direction: Direction::In,
            transfer_type: TransferType::Interrupt,
            max_packet_size: REPORT_MAX_PACKET_SIZE,
            bank_count: 1,
        },
        poll_limit: 100_000,
        configure_attempts: 3,
    };
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// USB device engine for the gamepad.
///
/// Feed it [`UsbEvent`]s, usually from [`Engine::poll`] inside the USB
/// interrupt handler. It owns the device state; the peripheral and the
/// input source are borrowed per call.
///
/// # Example
///
/// ```ignore
/// let mut engine = Engine::new(EngineConfig::DEFAULT);
/// engine.power_on(&mut usb);
///
/// // USB interrupt
/// if let Err(err) = engine.poll(&mut usb, &mut buttons) {
///     // log and carry on; the host retries
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    device: DeviceState,
}

impl Engine {
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self {
            config,
            device: DeviceState::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    pub fn state(&self) -> UsbState {
        self.device.state
    }

    /// Bring the peripheral up and listen for VBUS and bus resets.
    ///
    /// Call with interrupts masked. Attaches right away when VBUS is
    /// already present.
    pub fn power_on<P: UsbPeripheral + ?Sized>(&mut self, hw: &mut P) {
        self.device = DeviceState::new();
        hw.enable();
        hw.clear_flag(Flag::Vbus);
        hw.clear_flag(Flag::EndOfReset);
        hw.set_interrupt(Flag::Vbus, true);
        hw.set_interrupt(Flag::EndOfReset, true);
        if hw.vbus_present() {
            hw.attach();
        }
        info!("usb powered on");
    }

    /// Leave the bus and switch the peripheral off.
    pub fn power_off<P: UsbPeripheral + ?Sized>(&mut self, hw: &mut P) {
        hw.detach();
        enumeration::deactivate_report(hw, &self.config, &mut self.device);
        hw.disable();
        self.device = DeviceState::new();
        info!("usb powered off");
    }

    /// Handle one event.
    pub fn handle<P, I>(
        &mut self,
        hw: &mut P,
        input: &mut I,
        event: UsbEvent,
    ) -> Result<(), UsbError>
    where
        P: UsbPeripheral + ?Sized,
        I: InputSource + ?Sized,
    {
        let config = &self.config;
        let device = &mut self.device;
        match event {
            UsbEvent::PowerChanged(present) => {
                enumeration::power_changed(hw, config, device, present);
                Ok(())
            }
            UsbEvent::BusReset => enumeration::bus_reset(hw, config, device),
            UsbEvent::SetupReceived => control::handle_setup(hw, config, device, input),
            UsbEvent::InReady(0) => {
                enumeration::complete_address(hw, device);
                Ok(())
            }
            UsbEvent::InReady(endpoint) => {
                report::on_in_ready(hw, config, device, input, endpoint);
                Ok(())
            }
            UsbEvent::OutReceived(0) => {
                control::acknowledge_status(hw);
                Ok(())
            }
            UsbEvent::OutReceived(endpoint) => {
                // No OUT endpoints besides control: drop whatever came in.
                hw.clear_flag(Flag::OutReceived(endpoint));
                hw.release_out(endpoint);
                Ok(())
            }
        }
    }

    /// Handle every pending event.
    ///
    /// Keeps going after an error so one failed request cannot starve the
    /// others; the first error is returned.
    pub fn poll<P, I>(&mut self, hw: &mut P, input: &mut I) -> Result<(), UsbError>
    where
        P: UsbPeripheral + ?Sized,
        I: InputSource + ?Sized,
    {
        let mut result = Ok(());
        for event in pending_events(&*hw) {
            trace!("event {:?}", event);
            if let Err(err) = self.handle(hw, input, event) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::DEFAULT)
    }
}
