//! Input-sampling collaborator trait.

use hidpad_proto::GamepadState;

/// Source of gamepad snapshots for the report endpoint.
///
/// Called from interrupt context on every IN-ready event of the report
/// endpoint, so implementations must never block. Returning `None` means
/// "nothing new since the last call"; the engine then retransmits the last
/// report it sent.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait InputSource {
    /// Take the latest snapshot if one arrived since the previous call.
    fn sample(&mut self) -> Option<GamepadState>;
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn sample(&mut self) -> Option<GamepadState> {
        (**self).sample()
    }
}

/// Input source that never produces a sample.
///
/// Useful while the device is enumerating without a sampler attached; the
/// report endpoint then keeps sending the neutral report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl InputSource for NoInput {
    fn sample(&mut self) -> Option<GamepadState> {
        None
    }
}
