//! USB HID gamepad firmware for RP2040.
//!
//! This crate provides the chip-specific half of the gamepad: the USB
//! controller behind [`hidpad_core::UsbPeripheral`], the interrupt handler
//! that drives the engine, and the GPIO button sampler feeding it.

#![no_std]

// Re-export core types for convenience
pub use hidpad_core::{Engine, EngineConfig, InputSource, UsbError, UsbState};
pub use hidpad_proto::{Buttons, GamepadState, Hat};

pub mod buttons;
pub mod usb_hw;
pub mod usb_irq;

pub use buttons::{ButtonPins, DirectionPins, SharedInput};
pub use usb_hw::Rp2040Usb;
pub use usb_irq::{UsbContext, UsbInterruptHandler};

/// Engine settings for the RP2040.
///
/// The default control and report endpoint layout, with a longer ready-flag
/// wait: the core runs at 125 MHz and a full-speed frame is 1 ms.
pub const ENGINE_CONFIG: EngineConfig = EngineConfig {
    poll_limit: 2_000_000,
    ..EngineConfig::DEFAULT
};
