//! Device-level state machine: power, bus reset, address and configuration.
//!
//! ```text
//! Powered --reset--> Default --SET_ADDRESS(n)--> Addressed --SET_CONFIGURATION(1)--> Configured
//!    ^                  ^                           ^  <---SET_CONFIGURATION(0)---------'
//!    |                  '----------- bus reset from any state
//!    '-------------- VBUS lost
//! ```

use hidpad_proto::{GamepadReport, CONFIGURATION_VALUE};

use crate::engine::EngineConfig;
use crate::error::{HardwareError, UsbError};
use crate::peripheral::{activate_endpoint, EndpointConfig, Flag, UsbPeripheral};

/// Enumeration state of the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbState {
    /// Powered but not yet reset by the host.
    #[default]
    Powered,
    /// Reset, answering on address 0.
    Default,
    /// Has a unique address, no configuration selected.
    Addressed,
    /// Configuration selected, report endpoint live.
    Configured,
}

/// Everything the engine remembers about the device.
///
/// Owned by the [`Engine`](crate::Engine) and only mutated from its event
/// handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    pub state: UsbState,
    /// Address currently applied in hardware.
    pub address: u8,
    pub configuration: u8,
    pub interface_alt: u8,
    /// HID idle rate in units of 4 ms.
    pub idle_rate: u8,
    /// Address accepted by `SET_ADDRESS`, waiting for its status stage.
    pub pending_address: Option<u8>,
    /// Last report handed to the host, retransmitted when no new sample
    /// arrives.
    pub last_report: GamepadReport,
    /// Report endpoint is configured and may be written.
    pub report_active: bool,
}

impl DeviceState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: UsbState::Powered,
            address: 0,
            configuration: 0,
            interface_alt: 0,
            idle_rate: 0,
            pending_address: None,
            last_report: GamepadReport::neutral(),
            report_active: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.state == UsbState::Configured
    }

    /// Forget every host-assigned setting.
    fn clear_session(&mut self) {
        self.address = 0;
        self.configuration = 0;
        self.interface_alt = 0;
        self.idle_rate = 0;
        self.pending_address = None;
        self.report_active = false;
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

/// How a `SET_ADDRESS` request was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddressRequest {
    /// Stored; applied once the status stage has gone out.
    Deferred,
    /// Address 0: status stage only.
    Ignored,
    Rejected,
}

/// How a `SET_CONFIGURATION` request was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigurationChange {
    /// Report endpoint activated, device configured.
    Selected,
    /// Back to addressed, report endpoint off.
    Cleared,
    Rejected,
}

/// Activate an endpoint, retrying up to `attempts` times.
fn activate<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    endpoint: &EndpointConfig,
    attempts: u8,
) -> Result<(), HardwareError> {
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match activate_endpoint(hw, endpoint) {
            Ok(()) => return Ok(()),
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => warn!(
                "endpoint {} rejected configuration (attempt {}): {:?}",
                endpoint.number,
                attempt,
                err
            ),
        }
    }
}

/// Switch the report endpoint off.
pub(crate) fn deactivate_report<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
) {
    let number = config.report_endpoint.number;
    hw.set_interrupt(Flag::InReady(number), false);
    hw.disable_endpoint(number);
    device.report_active = false;
}

/// Bus reset: back to `Default` from any state, control endpoint re-armed.
///
/// Cancels any control transfer in flight. If endpoint 0 cannot be
/// configured the device drops back to `Powered` and waits for the host's
/// next reset.
pub(crate) fn bus_reset<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
) -> Result<(), UsbError> {
    hw.clear_flag(Flag::EndOfReset);
    device.clear_session();
    device.state = UsbState::Default;
    hw.set_address(0);
    deactivate_report(hw, config, device);

    hw.set_interrupt(Flag::InReady(0), false);
    hw.set_interrupt(Flag::SetupReceived(0), false);
    hw.set_interrupt(Flag::OutReceived(0), false);
    hw.clear_flag(Flag::SetupReceived(0));
    hw.clear_flag(Flag::OutReceived(0));
    hw.clear_stall(0);

    let control = EndpointConfig::control(config.control_max_packet);
    if let Err(err) = activate(hw, &control, config.configure_attempts) {
        error!("control endpoint unavailable after reset: {:?}", err);
        device.state = UsbState::Powered;
        return Err(err.into());
    }

    hw.set_interrupt(Flag::SetupReceived(0), true);
    hw.set_interrupt(Flag::OutReceived(0), true);
    debug!("bus reset");
    Ok(())
}

/// VBUS changed: attach when present, fall back to `Powered` when lost.
pub(crate) fn power_changed<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
    present: bool,
) {
    hw.clear_flag(Flag::Vbus);
    if present {
        info!("vbus up, attaching");
        hw.attach();
    } else {
        info!("vbus lost, detaching");
        hw.detach();
        deactivate_report(hw, config, device);
        device.clear_session();
        device.state = UsbState::Powered;
    }
}

/// Take a `SET_ADDRESS` request. The hardware address is not touched here.
pub(crate) fn request_address(device: &mut DeviceState, value: u16) -> AddressRequest {
    if device.state == UsbState::Configured || value > 127 {
        return AddressRequest::Rejected;
    }
    if value == 0 {
        device.pending_address = None;
        return AddressRequest::Ignored;
    }
    device.pending_address = Some(value as u8);
    AddressRequest::Deferred
}

/// Status stage of `SET_ADDRESS` went out: apply the stored address.
pub(crate) fn complete_address<P: UsbPeripheral + ?Sized>(hw: &mut P, device: &mut DeviceState) {
    hw.set_interrupt(Flag::InReady(0), false);
    if let Some(address) = device.pending_address.take() {
        hw.set_address(address);
        device.address = address;
        if device.state == UsbState::Default {
            device.state = UsbState::Addressed;
        }
        info!("addressed as {}", address);
    }
}

/// Take a `SET_CONFIGURATION` request.
///
/// Configuration 1 (re)activates the report endpoint; if that keeps
/// failing the device stays addressed and the error is returned so the
/// request gets stalled.
pub(crate) fn set_configuration<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
    value: u16,
) -> Result<ConfigurationChange, UsbError> {
    if !matches!(device.state, UsbState::Addressed | UsbState::Configured) {
        return Ok(ConfigurationChange::Rejected);
    }

    if value == 0 {
        deactivate_report(hw, config, device);
        device.configuration = 0;
        device.state = UsbState::Addressed;
        debug!("configuration cleared");
        return Ok(ConfigurationChange::Cleared);
    }

    if value != u16::from(CONFIGURATION_VALUE) {
        return Ok(ConfigurationChange::Rejected);
    }

    let endpoint = config.report_endpoint;
    if let Err(err) = activate(hw, &endpoint, config.configure_attempts) {
        deactivate_report(hw, config, device);
        device.configuration = 0;
        device.state = UsbState::Addressed;
        error!("report endpoint unavailable: {:?}", err);
        return Err(err.into());
    }
    hw.clear_stall(endpoint.number);
    hw.set_interrupt(Flag::InReady(endpoint.number), true);
    device.configuration = CONFIGURATION_VALUE;
    device.interface_alt = 0;
    device.report_active = true;
    device.state = UsbState::Configured;
    info!("configured");
    Ok(ConfigurationChange::Selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPeripheral, Op};

    const CONFIG: EngineConfig = EngineConfig::DEFAULT;

    fn addressed() -> (MockPeripheral, DeviceState) {
        let mut hw = MockPeripheral::new();
        let mut device = DeviceState::new();
        bus_reset(&mut hw, &CONFIG, &mut device).unwrap();
        assert_eq!(request_address(&mut device, 9), AddressRequest::Deferred);
        complete_address(&mut hw, &mut device);
        hw.clear_log();
        (hw, device)
    }

    #[test]
    fn test_initial_state_is_powered() {
        let device = DeviceState::default();
        assert_eq!(device.state, UsbState::Powered);
        assert_eq!(device.last_report, GamepadReport::neutral());
        assert!(!device.is_configured());
    }

    #[test]
    fn test_bus_reset_arms_control_endpoint() {
        let mut hw = MockPeripheral::new();
        let mut device = DeviceState::new();
        hw.stalled[0] = true;
        hw.end_of_reset = true;
        bus_reset(&mut hw, &CONFIG, &mut device).unwrap();

        assert_eq!(device.state, UsbState::Default);
        assert!(!hw.end_of_reset);
        assert!(!hw.stalled[0]);
        assert_eq!(hw.configured[0], Some(EndpointConfig::control(32)));
        assert!(hw.interrupt_enabled(Flag::SetupReceived(0)));
        assert!(hw.interrupt_enabled(Flag::OutReceived(0)));
        assert!(!hw.interrupt_enabled(Flag::InReady(0)));
        let reset = hw.position(&Op::ResetEndpoint(0)).unwrap();
        let configure = hw.position(&Op::ConfigureEndpoint(EndpointConfig::control(32)));
        assert!(reset < configure.unwrap());
    }

    #[test]
    fn test_bus_reset_from_configured_clears_session() {
        let (mut hw, mut device) = addressed();
        set_configuration(&mut hw, &CONFIG, &mut device, 1).unwrap();
        device.idle_rate = 5;

        bus_reset(&mut hw, &CONFIG, &mut device).unwrap();
        assert_eq!(device.state, UsbState::Default);
        assert_eq!(device.address, 0);
        assert_eq!(device.configuration, 0);
        assert_eq!(device.idle_rate, 0);
        assert!(!device.report_active);
        assert_eq!(hw.address, 0);
        assert_eq!(hw.configured[1], None);
    }

    #[test]
    fn test_bus_reset_retries_then_falls_back() {
        let mut hw = MockPeripheral::new();
        let mut device = DeviceState::new();
        hw.reject_configure[0] = 2;
        bus_reset(&mut hw, &CONFIG, &mut device).unwrap();
        assert_eq!(device.state, UsbState::Default);

        hw.reject_configure[0] = CONFIG.configure_attempts;
        assert_eq!(
            bus_reset(&mut hw, &CONFIG, &mut device),
            Err(UsbError::Hardware(HardwareError::EndpointConfig { endpoint: 0 }))
        );
        assert_eq!(device.state, UsbState::Powered);
        assert!(!hw.interrupt_enabled(Flag::SetupReceived(0)));
        assert!(!hw.interrupt_enabled(Flag::OutReceived(0)));
    }

    #[test]
    fn test_address_applied_only_on_completion() {
        let mut hw = MockPeripheral::new();
        let mut device = DeviceState::new();
        bus_reset(&mut hw, &CONFIG, &mut device).unwrap();
        hw.clear_log();

        assert_eq!(request_address(&mut device, 0x2A), AddressRequest::Deferred);
        assert_eq!(device.state, UsbState::Default);
        assert_eq!(device.address, 0);
        assert!(hw.position(&Op::SetAddress(0x2A)).is_none());

        complete_address(&mut hw, &mut device);
        assert_eq!(hw.address, 0x2A);
        assert_eq!(device.address, 0x2A);
        assert_eq!(device.state, UsbState::Addressed);
        assert_eq!(device.pending_address, None);
    }

    #[test]
    fn test_address_zero_does_not_advance() {
        let mut hw = MockPeripheral::new();
        let mut device = DeviceState::new();
        bus_reset(&mut hw, &CONFIG, &mut device).unwrap();
        hw.clear_log();

        assert_eq!(request_address(&mut device, 0), AddressRequest::Ignored);
        complete_address(&mut hw, &mut device);
        assert_eq!(device.state, UsbState::Default);
        assert!(hw.position(&Op::SetAddress(0)).is_none());
    }

    #[test]
    fn test_address_rejected_when_configured_or_out_of_range() {
        let (mut hw, mut device) = addressed();
        assert_eq!(request_address(&mut device, 128), AddressRequest::Rejected);
        set_configuration(&mut hw, &CONFIG, &mut device, 1).unwrap();
        assert_eq!(request_address(&mut device, 3), AddressRequest::Rejected);
        assert_eq!(device.address, 9);
    }

    #[test]
    fn test_configuration_selects_and_clears() {
        let (mut hw, mut device) = addressed();
        assert_eq!(
            set_configuration(&mut hw, &CONFIG, &mut device, 1),
            Ok(ConfigurationChange::Selected)
        );
        assert!(device.is_configured());
        assert!(device.report_active);
        assert_eq!(device.configuration, 1);
        assert_eq!(hw.configured[1], Some(CONFIG.report_endpoint));
        assert!(hw.interrupt_enabled(Flag::InReady(1)));

        assert_eq!(
            set_configuration(&mut hw, &CONFIG, &mut device, 0),
            Ok(ConfigurationChange::Cleared)
        );
        assert_eq!(device.state, UsbState::Addressed);
        assert!(!device.report_active);
        assert_eq!(hw.configured[1], None);
        assert!(!hw.interrupt_enabled(Flag::InReady(1)));
    }

    #[test]
    fn test_configuration_rejected_in_default_or_unknown_value() {
        let mut hw = MockPeripheral::new();
        let mut device = DeviceState::new();
        bus_reset(&mut hw, &CONFIG, &mut device).unwrap();
        assert_eq!(
            set_configuration(&mut hw, &CONFIG, &mut device, 1),
            Ok(ConfigurationChange::Rejected)
        );

        let (mut hw, mut device) = addressed();
        assert_eq!(
            set_configuration(&mut hw, &CONFIG, &mut device, 2),
            Ok(ConfigurationChange::Rejected)
        );
        assert_eq!(device.state, UsbState::Addressed);
    }

    #[test]
    fn test_configuration_failure_stays_addressed() {
        let (mut hw, mut device) = addressed();
        hw.reject_configure[1] = CONFIG.configure_attempts;
        assert_eq!(
            set_configuration(&mut hw, &CONFIG, &mut device, 1),
            Err(UsbError::Hardware(HardwareError::EndpointConfig { endpoint: 1 }))
        );
        assert_eq!(device.state, UsbState::Addressed);
        assert_eq!(device.configuration, 0);
        assert!(!device.report_active);
        let attempts = hw
            .ops
            .iter()
            .filter(|op| matches!(op, Op::ConfigureEndpoint(c) if c.number == 1))
            .count();
        assert_eq!(attempts, usize::from(CONFIG.configure_attempts));
    }

    #[test]
    fn test_vbus_loss_returns_to_powered() {
        let (mut hw, mut device) = addressed();
        set_configuration(&mut hw, &CONFIG, &mut device, 1).unwrap();
        hw.vbus_changed = true;

        power_changed(&mut hw, &CONFIG, &mut device, false);
        assert!(!hw.vbus_changed);
        assert!(!hw.attached);
        assert_eq!(device.state, UsbState::Powered);
        assert!(!device.report_active);

        power_changed(&mut hw, &CONFIG, &mut device, true);
        assert!(hw.attached);
        assert_eq!(device.state, UsbState::Powered);
    }
}
