//! Interrupt conditions as an explicit event stream.

use heapless::Vec;

use crate::peripheral::{Flag, UsbPeripheral};

/// Number of endpoints the engine drives (control plus the report endpoint).
pub const ENDPOINT_COUNT: u8 = 2;

/// Upper bound on events collected from a single interrupt.
pub const MAX_EVENTS: usize = 2 + 3 * ENDPOINT_COUNT as usize;

/// Something the engine must react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbEvent {
    /// VBUS changed; carries the new level.
    PowerChanged(bool),
    /// End of a bus reset.
    BusReset,
    /// A SETUP packet arrived on the control endpoint.
    SetupReceived,
    /// The IN bank of an endpoint is free.
    InReady(u8),
    /// An OUT packet arrived on an endpoint.
    OutReceived(u8),
}

fn pending<P: UsbPeripheral + ?Sized>(hw: &P, flag: Flag) -> bool {
    hw.interrupt_enabled(flag) && hw.flag(flag)
}

/// Snapshot of every raised and enabled condition, in handling order.
///
/// A pending bus reset cancels everything else, so it is returned alone.
/// On the control endpoint the IN completion and the OUT status stage of
/// the previous transfer come before a new SETUP.
pub fn pending_events<P: UsbPeripheral + ?Sized>(hw: &P) -> Vec<UsbEvent, MAX_EVENTS> {
    let mut events = Vec::new();

    if pending(hw, Flag::EndOfReset) {
        let _ = events.push(UsbEvent::BusReset);
        return events;
    }

    if pending(hw, Flag::Vbus) {
        let _ = events.push(UsbEvent::PowerChanged(hw.vbus_present()));
    }
    if pending(hw, Flag::InReady(0)) {
        let _ = events.push(UsbEvent::InReady(0));
    }
    if pending(hw, Flag::OutReceived(0)) {
        let _ = events.push(UsbEvent::OutReceived(0));
    }
    if pending(hw, Flag::SetupReceived(0)) {
        let _ = events.push(UsbEvent::SetupReceived);
    }
    for ep in 1..ENDPOINT_COUNT {
        if pending(hw, Flag::InReady(ep)) {
            let _ = events.push(UsbEvent::InReady(ep));
        }
        if pending(hw, Flag::OutReceived(ep)) {
            let _ = events.push(UsbEvent::OutReceived(ep));
        }
    }

    events
}
