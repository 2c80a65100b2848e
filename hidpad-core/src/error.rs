//! Error types for the hardware facade and the engine.

/// Error reported by a [`UsbPeripheral`](crate::UsbPeripheral).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    /// The peripheral rejected the endpoint configuration (bank allocation
    /// or size check failed).
    EndpointConfig { endpoint: u8 },
    /// The peripheral cannot express the requested parameters at all.
    Unsupported { endpoint: u8 },
}

/// Error type for engine operations.
///
/// Invalid or unsupported requests are not errors: they are answered with
/// STALL and the engine returns `Ok(())`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbError {
    /// Endpoint activation failed after every configured attempt.
    Hardware(HardwareError),
    /// A bounded wait on a ready flag ran out of polls.
    Timeout { endpoint: u8 },
}

impl From<HardwareError> for UsbError {
    fn from(err: HardwareError) -> Self {
        UsbError::Hardware(err)
    }
}
