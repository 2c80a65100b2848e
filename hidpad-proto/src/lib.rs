//! USB wire types for the hidpad gamepad firmware.
//!
//! This crate holds everything that is fixed by the USB 2.0 and HID 1.11
//! specifications and by the device's own identity:
//!
//! - **Control transfers**: [`SetupPacket`] and its request decoding
//!   ([`RequestKind`], [`Recipient`], [`StandardRequest`], [`HidRequest`])
//! - **Descriptors**: the immutable byte tables describing the device and
//!   the [`describe()`] lookup used to answer `GET_DESCRIPTOR`
//! - **Gamepad types**: [`Buttons`], [`Hat`] and [`GamepadState`], the
//!   snapshot produced by the input-sampling side
//! - **Reports**: [`GamepadReport`], the packed input report sent on the
//!   interrupt IN endpoint
//!
//! # Report layout
//!
//! ```text
//! byte 0: [7..4] padding  [3..0] hat switch (0-7, 8 = centered)
//! byte 1: buttons 1-8
//! byte 2: [7..2] padding  [1..0] buttons 9-10
//! ```
//!
//! # Example
//!
//! ```
//! use hidpad_proto::{Buttons, GamepadReport, GamepadState, Hat};
//!
//! let state = GamepadState {
//!     buttons: Buttons::B1 | Buttons::B10,
//!     hat: Hat::Right,
//! };
//! let report = GamepadReport::from(&state);
//! assert_eq!(report.as_bytes(), [0x02, 0x01, 0x02]);
//! ```
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.
//! Descriptor tables live in `static` read-only memory.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod descriptor;
pub mod report;
pub mod request;
pub mod setup;
pub mod types;

pub use descriptor::{
    describe, Descriptor, DescriptorType, CONFIGURATION_DESCRIPTOR, CONFIGURATION_VALUE,
    CONTROL_MAX_PACKET_SIZE, DEVICE_DESCRIPTOR, ENDPOINT_DESCRIPTOR, HID_DESCRIPTOR,
    INTERFACE_DESCRIPTOR, REPORT_DESCRIPTOR, REPORT_ENDPOINT_ADDRESS, REPORT_MAX_PACKET_SIZE,
};
pub use report::{GamepadReport, ReportType};
pub use request::{HidRequest, StandardRequest, ENDPOINT_HALT};
pub use setup::{Direction, Recipient, RequestKind, SetupPacket, SETUP_PACKET_SIZE};
pub use types::{Buttons, GamepadState, Hat};
