//! SETUP packet decoding.
//!
//! Every control transfer opens with an 8-byte SETUP packet:
//!
//! ```text
//! offset  field          size
//! 0       bmRequestType  1     direction | kind | recipient
//! 1       bRequest       1
//! 2       wValue         2     little endian
//! 4       wIndex         2     little endian
//! 6       wLength        2     little endian
//! ```

/// Size of a SETUP packet on the wire.
pub const SETUP_PACKET_SIZE: usize = 8;

/// Data stage direction (bit 7 of `bmRequestType`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host to device (OUT).
    Out,
    /// Device to host (IN).
    In,
}

/// Request kind (bits 6..5 of `bmRequestType`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Standard,
    Class,
    Vendor,
    Reserved,
}

/// Request recipient (bits 4..0 of `bmRequestType`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
    Reserved,
}

/// A parsed SETUP packet.
///
/// Immutable once parsed; the engine consumes it exactly once per control
/// transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    /// Assemble a packet from the 8 bytes in FIFO order.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SETUP_PACKET_SIZE]) -> Self {
        Self {
            request_type: bytes[0],
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    /// Wire representation, the inverse of [`SetupPacket::from_bytes`].
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; SETUP_PACKET_SIZE] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    #[inline]
    #[must_use]
    pub const fn direction(&self) -> Direction {
        if self.request_type & 0x80 == 0 {
            Direction::Out
        } else {
            Direction::In
        }
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match (self.request_type >> 5) & 0b11 {
            0 => RequestKind::Standard,
            1 => RequestKind::Class,
            2 => RequestKind::Vendor,
            _ => RequestKind::Reserved,
        }
    }

    #[inline]
    #[must_use]
    pub const fn recipient(&self) -> Recipient {
        match self.request_type & 0b1_1111 {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            _ => Recipient::Reserved,
        }
    }

    /// High byte of `wValue`: descriptor type for `GET_DESCRIPTOR`, report
    /// type for `GET_REPORT`, duration for `SET_IDLE`.
    #[inline]
    #[must_use]
    pub const fn value_high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    /// Low byte of `wValue`: descriptor index, report ID or address.
    #[inline]
    #[must_use]
    pub const fn value_low(&self) -> u8 {
        self.value as u8
    }
}
