//! Platform-agnostic USB device engine for the hidpad gamepad.
//!
//! The engine enumerates the device, answers control requests on
//! endpoint 0 and streams gamepad reports on the interrupt IN endpoint. It
//! never touches registers: the chip is reached through the
//! [`UsbPeripheral`] trait, and button state comes from an
//! [`InputSource`]. Both are borrowed per call, so the same engine runs in
//! an interrupt handler on the target and against an in-memory peripheral
//! in host tests.
//!
//! # Overview
//!
//! - [`peripheral`]: Hardware Facade ([`UsbPeripheral`], [`Flag`], [`EndpointConfig`])
//! - [`event`]: interrupt conditions as [`UsbEvent`]s ([`pending_events`])
//! - [`enumeration`]: device state machine ([`UsbState`], [`DeviceState`])
//! - `control`: SETUP decoding and request handling on endpoint 0
//! - [`report`]: the report endpoint data path
//! - [`engine`]: [`Engine`], the single entry point, and [`EngineConfig`]
//!
//! # Event flow
//!
//! ```text
//! USB IRQ --> pending_events() --> Engine::handle()
//!                                    |- BusReset / PowerChanged -> enumeration
//!                                    |- SetupReceived / OutReceived(0) -> control
//!                                    |- InReady(0) -> deferred SET_ADDRESS
//!                                    '- InReady(1) -> report
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and logging (for embedded targets)
//! - **`log`**: Log through the `log` facade instead
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This must go first so the logging macros are visible in every module.
mod fmt;

mod control;
pub mod engine;
pub mod enumeration;
pub mod error;
pub mod event;
pub mod input;
pub mod peripheral;
pub mod report;

#[cfg(test)]
mod mock;

// Re-export main types at crate root
pub use engine::{Engine, EngineConfig};
pub use enumeration::{DeviceState, UsbState};
pub use error::{HardwareError, UsbError};
pub use event::{pending_events, UsbEvent, MAX_EVENTS};
pub use input::{InputSource, NoInput};
pub use peripheral::{Direction, EndpointConfig, Flag, TransferType, UsbPeripheral};
pub use report::current_report;
