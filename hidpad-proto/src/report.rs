//! Gamepad input report packing.

use crate::types::{Buttons, GamepadState, Hat};

/// Report type carried in the high byte of `wValue` by `GET_REPORT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReportType {
    Input = 0x01,
    Output = 0x02,
    Feature = 0x03,
}

impl ReportType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Input),
            0x02 => Some(Self::Output),
            0x03 => Some(Self::Feature),
            _ => None,
        }
    }
}

/// USB HID gamepad input report.
///
/// Matches the bit layout of
/// [`REPORT_DESCRIPTOR`](crate::descriptor::REPORT_DESCRIPTOR): the hat
/// nibble and its padding fill the first byte, the ten button bits and six
/// padding bits fill the next two (little endian).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadReport {
    pub hat: Hat,
    pub buttons: Buttons,
}

impl GamepadReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = 3;

    /// Neutral report: hat centered, nothing pressed.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            hat: Hat::Centered,
            buttons: Buttons::NONE,
        }
    }

    /// Convert the report to bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> [u8; Self::SIZE] {
        let buttons = (self.buttons.raw() & Buttons::MASK).to_le_bytes();
        [self.hat.raw() & 0x0F, buttons[0], buttons[1]]
    }

    /// Decode a report, ignoring padding bits.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            hat: Hat::from_raw(bytes[0] & 0x0F),
            buttons: Buttons(u16::from_le_bytes([bytes[1], bytes[2]]) & Buttons::MASK),
        }
    }
}

impl From<&GamepadState> for GamepadReport {
    fn from(state: &GamepadState) -> Self {
        Self {
            hat: state.hat,
            buttons: Buttons(state.buttons.raw() & Buttons::MASK),
        }
    }
}
