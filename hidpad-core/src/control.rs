//! Control transfer dispatcher for endpoint 0.
//!
//! A SETUP packet is read, decoded and answered in one go: the handler for
//! its `(kind, recipient)` pair produces a [`Response`], which is then sent
//! as a data stage, a zero-length status stage or a STALL. Anything the
//! device does not support is stalled.

use hidpad_proto::{
    describe, DescriptorType, GamepadReport, HidRequest, Recipient, ReportType, RequestKind,
    SetupPacket, StandardRequest, ENDPOINT_HALT, SETUP_PACKET_SIZE,
};

use crate::engine::EngineConfig;
use crate::enumeration::{self, AddressRequest, ConfigurationChange, DeviceState, UsbState};
use crate::error::UsbError;
use crate::input::InputSource;
use crate::peripheral::{wait_for, Flag, UsbPeripheral};
use crate::report;

/// What goes back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Response {
    /// Data stage from a static table.
    Data(&'static [u8]),
    /// Data stage from a few computed bytes. Sized for the largest of them,
    /// the input report.
    Inline([u8; GamepadReport::SIZE], usize),
    /// No data stage, zero-length status packet.
    Status,
    Stall,
}

impl Response {
    fn inline(bytes: &[u8]) -> Self {
        let mut buf = [0; GamepadReport::SIZE];
        let len = bytes.len().min(GamepadReport::SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);
        Response::Inline(buf, len)
    }
}

/// Work left after the response went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Followup {
    None,
    /// Apply the pending address once the status packet has been taken.
    ArmAddress,
    /// Put the first report into the freshly activated report endpoint.
    PrimeReport,
}

/// Handle a SETUP-received event on endpoint 0.
pub(crate) fn handle_setup<P, I>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
    input: &mut I,
) -> Result<(), UsbError>
where
    P: UsbPeripheral + ?Sized,
    I: InputSource + ?Sized,
{
    let mut bytes = [0u8; SETUP_PACKET_SIZE];
    for byte in bytes.iter_mut() {
        *byte = hw.read_byte(0);
    }
    hw.clear_stall(0);
    hw.set_interrupt(Flag::InReady(0), false);
    hw.clear_flag(Flag::SetupReceived(0));

    let setup = SetupPacket::from_bytes(bytes);
    trace!("setup {:?}", setup);

    let (response, followup) = match dispatch(hw, config, device, input, &setup) {
        Ok(answer) => answer,
        Err(err) => {
            hw.stall(0);
            return Err(err);
        }
    };

    if let Err(err) = respond(hw, config, &setup, response) {
        hw.stall(0);
        return Err(err);
    }

    match followup {
        Followup::None => {}
        Followup::ArmAddress => hw.set_interrupt(Flag::InReady(0), true),
        Followup::PrimeReport => report::prime(hw, config, device, input),
    }
    Ok(())
}

/// OUT packet on endpoint 0: the host's zero-length status stage after an
/// IN data stage. Nothing is expected in it.
pub(crate) fn acknowledge_status<P: UsbPeripheral + ?Sized>(hw: &mut P) {
    hw.clear_flag(Flag::OutReceived(0));
    hw.release_out(0);
}

fn dispatch<P, I>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
    input: &mut I,
    setup: &SetupPacket,
) -> Result<(Response, Followup), UsbError>
where
    P: UsbPeripheral + ?Sized,
    I: InputSource + ?Sized,
{
    match (setup.kind(), setup.recipient()) {
        (RequestKind::Standard, Recipient::Device) => standard_device(hw, config, device, setup),
        (RequestKind::Standard, Recipient::Interface) => {
            Ok((standard_interface(device, setup), Followup::None))
        }
        (RequestKind::Standard, Recipient::Endpoint) => {
            Ok(standard_endpoint(hw, config, device, setup))
        }
        (RequestKind::Class, Recipient::Interface) => {
            Ok((hid_class(device, input, setup), Followup::None))
        }
        _ => {
            debug!("unsupported request type {:#x}", setup.request_type);
            Ok((Response::Stall, Followup::None))
        }
    }
}

fn standard_device<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
    setup: &SetupPacket,
) -> Result<(Response, Followup), UsbError> {
    let response = match StandardRequest::from_u8(setup.request) {
        // Bus powered, no remote wakeup.
        Some(StandardRequest::GetStatus) => Response::inline(&[0, 0]),
        Some(StandardRequest::SetAddress) => {
            return Ok(match enumeration::request_address(device, setup.value) {
                AddressRequest::Deferred => (Response::Status, Followup::ArmAddress),
                AddressRequest::Ignored => (Response::Status, Followup::None),
                AddressRequest::Rejected => (Response::Stall, Followup::None),
            });
        }
        Some(StandardRequest::GetDescriptor) => {
            match describe(setup.value_high(), setup.value_low()) {
                Some(descriptor) => Response::Data(descriptor.as_bytes()),
                None => Response::Stall,
            }
        }
        Some(StandardRequest::GetConfiguration) => Response::inline(&[device.configuration]),
        Some(StandardRequest::SetConfiguration) => {
            return Ok(
                match enumeration::set_configuration(hw, config, device, setup.value)? {
                    ConfigurationChange::Selected => (Response::Status, Followup::PrimeReport),
                    ConfigurationChange::Cleared => (Response::Status, Followup::None),
                    ConfigurationChange::Rejected => (Response::Stall, Followup::None),
                },
            );
        }
        _ => Response::Stall,
    };
    Ok((response, Followup::None))
}

fn standard_interface(device: &mut DeviceState, setup: &SetupPacket) -> Response {
    if setup.index != 0 {
        return Response::Stall;
    }
    match StandardRequest::from_u8(setup.request) {
        Some(StandardRequest::GetStatus) => Response::inline(&[0, 0]),
        Some(StandardRequest::GetInterface) => Response::inline(&[device.interface_alt]),
        Some(StandardRequest::SetInterface | StandardRequest::SetConfiguration)
            if setup.value == 0 =>
        {
            device.interface_alt = 0;
            Response::Status
        }
        Some(StandardRequest::GetDescriptor) => match DescriptorType::from_u8(setup.value_high()) {
            Some(DescriptorType::Hid | DescriptorType::Report) => {
                match describe(setup.value_high(), setup.value_low()) {
                    Some(descriptor) => Response::Data(descriptor.as_bytes()),
                    None => Response::Stall,
                }
            }
            _ => Response::Stall,
        },
        _ => Response::Stall,
    }
}

fn standard_endpoint<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
    device: &DeviceState,
    setup: &SetupPacket,
) -> (Response, Followup) {
    let stall = (Response::Stall, Followup::None);
    let report = config.report_endpoint;
    let Ok(address) = u8::try_from(setup.index) else {
        return stall;
    };
    let is_control = address & 0x7F == 0;
    let is_report = address == report.address() && device.state == UsbState::Configured;
    if !is_control && !is_report {
        return stall;
    }
    let number = address & 0x0F;

    match StandardRequest::from_u8(setup.request) {
        Some(StandardRequest::GetStatus) => {
            let halted = u8::from(hw.is_stalled(number));
            (Response::inline(&[halted, 0]), Followup::None)
        }
        Some(StandardRequest::SetFeature) if is_report && setup.value == ENDPOINT_HALT => {
            hw.stall(number);
            (Response::Status, Followup::None)
        }
        Some(StandardRequest::ClearFeature) if is_report && setup.value == ENDPOINT_HALT => {
            hw.clear_stall(number);
            hw.reset_endpoint(number);
            (Response::Status, Followup::PrimeReport)
        }
        _ => stall,
    }
}

fn hid_class<I: InputSource + ?Sized>(
    device: &mut DeviceState,
    input: &mut I,
    setup: &SetupPacket,
) -> Response {
    if setup.index != 0 {
        return Response::Stall;
    }
    match HidRequest::from_u8(setup.request) {
        Some(HidRequest::GetReport) => match ReportType::from_u8(setup.value_high()) {
            Some(ReportType::Input) => {
                Response::inline(&report::current_report(device, input).as_bytes())
            }
            _ => Response::Stall,
        },
        Some(HidRequest::GetIdle) => Response::inline(&[device.idle_rate]),
        Some(HidRequest::SetIdle) => {
            // Report ID in the low byte is ignored: the device has one report.
            device.idle_rate = setup.value_high();
            Response::Status
        }
        _ => Response::Stall,
    }
}

fn respond<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
    setup: &SetupPacket,
    response: Response,
) -> Result<(), UsbError> {
    match response {
        Response::Data(data) => send_control_in(hw, config, setup.length, data),
        Response::Inline(buf, len) => send_control_in(hw, config, setup.length, &buf[..len]),
        Response::Status => send_status(hw, config),
        Response::Stall => {
            debug!(
                "stall request {:#x} type {:#x}",
                setup.request,
                setup.request_type
            );
            hw.stall(0);
            Ok(())
        }
    }
}

/// Zero-length IN packet closing a no-data control transfer.
fn send_status<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
) -> Result<(), UsbError> {
    wait_for(&*hw, Flag::InReady(0), config.poll_limit, 0)?;
    hw.commit_in(0);
    Ok(())
}

/// Wait for a free IN bank on endpoint 0.
///
/// Returns `Ok(false)` if the host has already started the status stage,
/// which ends the data stage early.
fn wait_in_bank<P: UsbPeripheral + ?Sized>(hw: &P, limit: u32) -> Result<bool, UsbError> {
    for _ in 0..limit {
        if hw.flag(Flag::OutReceived(0)) {
            return Ok(false);
        }
        if hw.flag(Flag::InReady(0)) {
            return Ok(true);
        }
        core::hint::spin_loop();
    }
    Err(UsbError::Timeout { endpoint: 0 })
}

/// Send an IN data stage on endpoint 0.
///
/// At most `requested` bytes of `data` go out, in packets of the control
/// endpoint's maximum size. The transfer ends with the first short packet;
/// when it ends on a packet boundary before `requested` bytes a
/// zero-length packet is added, so a full-size last packet is only left
/// unterminated when the host got everything it asked for. With
/// `requested == 0` a single zero-length packet is sent.
pub(crate) fn send_control_in<P: UsbPeripheral + ?Sized>(
    hw: &mut P,
    config: &EngineConfig,
    requested: u16,
    data: &[u8],
) -> Result<(), UsbError> {
    let requested = usize::from(requested);
    let total = data.len().min(requested);
    let max_packet = usize::from(config.control_max_packet).max(1);
    let mut offset = 0;

    loop {
        if !wait_in_bank(&*hw, config.poll_limit)? {
            debug!("data stage ended by host after {} bytes", offset);
            return Ok(());
        }

        let end = total.min(offset + max_packet);
        let chunk = &data[offset..end];
        for byte in chunk {
            hw.write_byte(0, *byte);
        }
        hw.commit_in(0);
        offset = end;

        if chunk.len() < max_packet || offset == requested {
            return Ok(());
        }
    }
}
