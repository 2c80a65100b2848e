//! Report endpoint data path.

use hidpad_proto::GamepadReport;

use crate::engine::EngineConfig;
use crate::enumeration::DeviceState;
use crate::input::InputSource;
use crate::peripheral::{Flag, UsbPeripheral};

/// Latest report: a fresh sample if the input source has one, otherwise the
/// last report sent.
pub fn current_report<I: InputSource + ?Sized>(
    device: &mut DeviceState,
    input: &mut I,
) -> GamepadReport {
    if let Some(state) = input.sample() {
        device.last_report = GamepadReport::from(&state);
    }
    device.last_report
}

/// The report endpoint's IN bank is free: refill it.
pub(crate) fn on_in_ready<P, I>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
    input: &mut I,
    endpoint: u8,
) where
    P: UsbPeripheral + ?Sized,
    I: InputSource + ?Sized,
{
    hw.clear_flag(Flag::InReady(endpoint));
    if endpoint != config.report_endpoint.number {
        return;
    }
    transmit(hw, config, device, input);
}

/// Fill the report bank right after configuration, so the host's first IN
/// token already finds data.
pub(crate) fn prime<P, I>(
    hw: &mut P,
    config: &EngineConfig,
    device: &mut DeviceState,
    input: &mut I,
) where
    P: UsbPeripheral + ?Sized,
    I: InputSource + ?Sized,
{
    transmit(hw, config, device, input);
}

/// Write one report if the endpoint is live, not halted and its bank free.
fn transmit<P, I>(hw: &mut P, config: &EngineConfig, device: &mut DeviceState, input: &mut I)
where
    P: UsbPeripheral + ?Sized,
    I: InputSource + ?Sized,
{
    let endpoint = config.report_endpoint.number;
    if !device.is_configured() || !device.report_active {
        return;
    }
    if hw.is_stalled(endpoint) || !hw.flag(Flag::InReady(endpoint)) {
        return;
    }

    let report = current_report(device, input);
    for byte in report.as_bytes() {
        hw.write_byte(endpoint, byte);
    }
    hw.commit_in(endpoint);
    trace!("report {:?}", report);
}
