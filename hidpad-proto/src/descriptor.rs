//! Descriptor Store: the immutable byte tables describing the device.
//!
//! The device exposes one configuration with one vendor-specific interface
//! (class 0xFF, so hosts drive it through the raw-HID path rather than the
//! boot protocol) carrying a HID class descriptor and one interrupt IN
//! endpoint for gamepad reports.
//!
//! Lengths are never hardcoded next to the tables: [`Descriptor::len`]
//! reads `bLength` (or `wTotalLength` for the configuration) straight from
//! the stored bytes so the two cannot drift apart.

/// Vendor ID (Atmel Corp.).
pub const VENDOR_ID: u16 = 0x03EB;

/// Product ID.
pub const PRODUCT_ID: u16 = 0x2FF4;

/// Device release number (BCD).
pub const DEVICE_RELEASE: u16 = 0x0100;

/// Maximum packet size of control endpoint 0 (`bMaxPacketSize0`).
pub const CONTROL_MAX_PACKET_SIZE: u8 = 32;

/// Address of the interrupt IN endpoint carrying gamepad reports.
pub const REPORT_ENDPOINT_ADDRESS: u8 = 0x81;

/// `wMaxPacketSize` of the report endpoint.
pub const REPORT_MAX_PACKET_SIZE: u16 = 32;

/// Polling interval of the report endpoint in milliseconds.
pub const REPORT_INTERVAL_MS: u8 = 4;

/// `bConfigurationValue` of the only configuration.
pub const CONFIGURATION_VALUE: u8 = 1;

/// Descriptor type codes (high byte of `wValue` in `GET_DESCRIPTOR`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DescriptorType {
    Device = 0x01,
    Configuration = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
    Hid = 0x21,
    Report = 0x22,
}

impl DescriptorType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x01 => Self::Device,
            0x02 => Self::Configuration,
            0x03 => Self::String,
            0x04 => Self::Interface,
            0x05 => Self::Endpoint,
            0x21 => Self::Hid,
            0x22 => Self::Report,
            _ => return None,
        })
    }
}

// Input report, 24 bits:
// - hat switch, 4 bits, logical 0-7 (0-315 degrees), null state outside
// - 4 constant padding bits
// - buttons 1-10, 1 bit each
// - 6 constant padding bits
const REPORT: [u8; 56] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    //
    // --- Hat switch ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x39, //   Usage (Hat switch)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x07, //   Logical Maximum (7)
    0x35, 0x00, //   Physical Minimum (0)
    0x46, 0x3B, 0x01, //   Physical Maximum (315)
    0x65, 0x14, //   Unit (Eng Rot: Angular Pos)
    0x75, 0x04, //   Report Size (4)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x42, //   Input (Data, Variable, Absolute, Null)
    0x65, 0x00, //   Unit (None)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x04, //   Report Count (4)
    0x81, 0x03, //   Input (Constant, Variable, Absolute)
    //
    // --- Buttons (10 buttons) ---
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x0A, //   Usage Maximum (Button 10)
    0x15, 0x00, //   Logical Minimum (0)
    0x95, 0x0A, //   Report Count (10)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x06, //   Report Count (6)
    0x81, 0x03, //   Input (Constant, Variable, Absolute)
    //
    0xC0, // End Collection
];

const REPORT_DESCRIPTOR_LENGTH: usize = REPORT.len();

const DEVICE: [u8; 18] = [
    18,   // bLength
    0x01, // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB 2.00
    0x00, // bDeviceClass (per interface)
    0x00, // bDeviceSubClass
    0x00, // bDeviceProtocol
    CONTROL_MAX_PACKET_SIZE, // bMaxPacketSize0
    VENDOR_ID as u8,
    (VENDOR_ID >> 8) as u8, // idVendor
    PRODUCT_ID as u8,
    (PRODUCT_ID >> 8) as u8, // idProduct
    DEVICE_RELEASE as u8,
    (DEVICE_RELEASE >> 8) as u8, // bcdDevice
    0, // iManufacturer
    0, // iProduct
    0, // iSerialNumber
    1, // bNumConfigurations
];

const CONFIGURATION_HEADER_LENGTH: usize = 9;

const CONFIGURATION_HEADER: [u8; CONFIGURATION_HEADER_LENGTH] = [
    CONFIGURATION_HEADER_LENGTH as u8, // bLength
    0x02, // bDescriptorType (Configuration)
    CONFIGURATION_TOTAL_LENGTH as u8,
    (CONFIGURATION_TOTAL_LENGTH >> 8) as u8, // wTotalLength
    1,    // bNumInterfaces
    CONFIGURATION_VALUE, // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered, no remote wakeup)
    0xFA, // bMaxPower (500 mA)
];

const INTERFACE: [u8; 9] = [
    9,    // bLength
    0x04, // bDescriptorType (Interface)
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    0xFF, // bInterfaceClass (vendor specific)
    0x5D, // bInterfaceSubClass
    0x01, // bInterfaceProtocol
    0,    // iInterface
];

const HID: [u8; 9] = [
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID 1.11
    0x00, // bCountryCode
    0x01, // bNumDescriptors
    0x22, // bDescriptorType[0] (Report)
    REPORT_DESCRIPTOR_LENGTH as u8,
    (REPORT_DESCRIPTOR_LENGTH >> 8) as u8, // wDescriptorLength[0]
];

const ENDPOINT: [u8; 7] = [
    7,    // bLength
    0x05, // bDescriptorType (Endpoint)
    REPORT_ENDPOINT_ADDRESS, // bEndpointAddress (IN 1)
    0x03, // bmAttributes (interrupt)
    REPORT_MAX_PACKET_SIZE as u8,
    (REPORT_MAX_PACKET_SIZE >> 8) as u8, // wMaxPacketSize
    REPORT_INTERVAL_MS, // bInterval
];

const CONFIGURATION_TOTAL_LENGTH: usize =
    CONFIGURATION_HEADER_LENGTH + INTERFACE.len() + HID.len() + ENDPOINT.len();

/// Concatenate the configuration header with its subordinate descriptors.
const fn configuration_bundle() -> [u8; CONFIGURATION_TOTAL_LENGTH] {
    let parts: [&[u8]; 4] = [&CONFIGURATION_HEADER, &INTERFACE, &HID, &ENDPOINT];
    let mut out = [0u8; CONFIGURATION_TOTAL_LENGTH];
    let mut offset = 0;
    let mut p = 0;
    while p < parts.len() {
        let part = parts[p];
        let mut i = 0;
        while i < part.len() {
            out[offset] = part[i];
            offset += 1;
            i += 1;
        }
        p += 1;
    }
    out
}

/// Device descriptor.
pub static DEVICE_DESCRIPTOR: [u8; 18] = DEVICE;

/// Configuration descriptor followed by interface, HID and endpoint
/// descriptors, as returned for `GET_DESCRIPTOR(Configuration)`.
pub static CONFIGURATION_DESCRIPTOR: [u8; CONFIGURATION_TOTAL_LENGTH] = configuration_bundle();

/// Interface descriptor.
pub static INTERFACE_DESCRIPTOR: [u8; 9] = INTERFACE;

/// HID class descriptor.
pub static HID_DESCRIPTOR: [u8; 9] = HID;

/// Report endpoint descriptor.
pub static ENDPOINT_DESCRIPTOR: [u8; 7] = ENDPOINT;

/// HID report descriptor: one Game Pad application collection.
pub static REPORT_DESCRIPTOR: [u8; REPORT_DESCRIPTOR_LENGTH] = REPORT;

/// A descriptor table in read-only memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Descriptor {
    kind: DescriptorType,
    table: &'static [u8],
}

impl Descriptor {
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> DescriptorType {
        self.kind
    }

    /// Length declared by the descriptor itself, clamped to the table.
    #[must_use]
    pub fn len(&self) -> usize {
        let declared = match self.kind {
            DescriptorType::Configuration => match self.table {
                [_, _, lo, hi, ..] => u16::from_le_bytes([*lo, *hi]) as usize,
                _ => 0,
            },
            DescriptorType::Report => self.table.len(),
            _ => self.table.first().copied().unwrap_or(0) as usize,
        };
        declared.min(self.table.len())
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bytes to transmit.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &'static [u8] {
        &self.table[..self.len()]
    }
}

/// Look up a descriptor by `(type, index)`.
///
/// Returns `None` for anything the device does not provide (string
/// descriptors, unknown types, indices other than 0), which the control
/// dispatcher answers with STALL.
#[must_use]
pub fn describe(descriptor_type: u8, index: u8) -> Option<Descriptor> {
    if index != 0 {
        return None;
    }
    let kind = DescriptorType::from_u8(descriptor_type)?;
    let table: &'static [u8] = match kind {
        DescriptorType::Device => &DEVICE_DESCRIPTOR,
        DescriptorType::Configuration => &CONFIGURATION_DESCRIPTOR,
        DescriptorType::Interface => &INTERFACE_DESCRIPTOR,
        DescriptorType::Endpoint => &ENDPOINT_DESCRIPTOR,
        DescriptorType::Hid => &HID_DESCRIPTOR,
        DescriptorType::Report => &REPORT_DESCRIPTOR,
        DescriptorType::String => return None,
    };
    Some(Descriptor { kind, table })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DescriptorType; 6] = [
        DescriptorType::Device,
        DescriptorType::Configuration,
        DescriptorType::Interface,
        DescriptorType::Endpoint,
        DescriptorType::Hid,
        DescriptorType::Report,
    ];

    #[test]
    fn test_every_descriptor_fits_its_table() {
        for kind in ALL {
            let desc = describe(kind as u8, 0).unwrap();
            assert_eq!(desc.kind(), kind);
            assert!(desc.len() <= desc.table.len());
            assert_eq!(desc.as_bytes(), &desc.table[..desc.len()]);
            assert!(!desc.is_empty());
        }
    }

    #[test]
    fn test_header_type_bytes_match() {
        for kind in ALL {
            if kind == DescriptorType::Report {
                continue;
            }
            let desc = describe(kind as u8, 0).unwrap();
            assert_eq!(desc.as_bytes()[1], kind as u8);
        }
    }

    #[test]
    fn test_device_descriptor() {
        let desc = describe(0x01, 0).unwrap();
        let bytes = desc.as_bytes();
        assert_eq!(bytes.len(), 18);
        assert_eq!(bytes[0] as usize, bytes.len());
        assert_eq!(bytes[7], CONTROL_MAX_PACKET_SIZE);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), VENDOR_ID);
        assert_eq!(u16::from_le_bytes([bytes[10], bytes[11]]), PRODUCT_ID);
        assert_eq!(bytes[17], 1, "bNumConfigurations");
    }

    #[test]
    fn test_configuration_bundle_layout() {
        let bytes = describe(0x02, 0).unwrap().as_bytes();
        assert_eq!(bytes.len(), 34);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]) as usize, bytes.len());
        assert_eq!(bytes[5], CONFIGURATION_VALUE);
        assert_eq!(&bytes[9..18], &INTERFACE_DESCRIPTOR);
        assert_eq!(&bytes[18..27], &HID_DESCRIPTOR);
        assert_eq!(&bytes[27..34], &ENDPOINT_DESCRIPTOR);
    }

    #[test]
    fn test_configuration_header_declares_bundle_length() {
        assert_eq!(CONFIGURATION_HEADER[0] as usize, CONFIGURATION_HEADER_LENGTH);
        assert_eq!(CONFIGURATION_DESCRIPTOR.len(), CONFIGURATION_TOTAL_LENGTH);
        let total = u16::from_le_bytes([CONFIGURATION_HEADER[2], CONFIGURATION_HEADER[3]]);
        assert_eq!(usize::from(total), CONFIGURATION_HEADER_LENGTH + 9 + 9 + 7);
    }

    #[test]
    fn test_configuration_walks_cleanly() {
        // Each sub-descriptor's bLength must land exactly on the next header.
        let bytes = describe(0x02, 0).unwrap().as_bytes();
        let mut offset = 0;
        let mut types = [0u8; 4];
        let mut count = 0;
        while offset < bytes.len() {
            types[count] = bytes[offset + 1];
            offset += bytes[offset] as usize;
            count += 1;
        }
        assert_eq!(offset, bytes.len());
        assert_eq!(types, [0x02, 0x04, 0x21, 0x05]);
    }

    #[test]
    fn test_interface_is_vendor_specific_with_one_endpoint() {
        assert_eq!(INTERFACE_DESCRIPTOR[4], 1);
        assert_eq!(INTERFACE_DESCRIPTOR[5], 0xFF);
    }

    #[test]
    fn test_hid_descriptor_declares_report_length() {
        let declared = u16::from_le_bytes([HID_DESCRIPTOR[7], HID_DESCRIPTOR[8]]) as usize;
        assert_eq!(declared, REPORT_DESCRIPTOR.len());
        assert_eq!(declared, describe(0x22, 0).unwrap().len());
    }

    #[test]
    fn test_endpoint_descriptor() {
        assert_eq!(ENDPOINT_DESCRIPTOR[2], REPORT_ENDPOINT_ADDRESS);
        assert_eq!(ENDPOINT_DESCRIPTOR[3], 0x03);
        assert_eq!(
            u16::from_le_bytes([ENDPOINT_DESCRIPTOR[4], ENDPOINT_DESCRIPTOR[5]]),
            REPORT_MAX_PACKET_SIZE
        );
    }

    #[test]
    fn test_report_descriptor_hat_uses_null_state() {
        // Input (Data, Var, Abs, Null) directly after the hat's report count.
        let pos = REPORT_DESCRIPTOR
            .windows(2)
            .position(|w| w == [0x81, 0x42])
            .unwrap();
        assert_eq!(&REPORT_DESCRIPTOR[pos - 4..pos], &[0x75, 0x04, 0x95, 0x01]);
        assert_eq!(REPORT_DESCRIPTOR.last(), Some(&0xC0));
    }

    #[test]
    fn test_unsupported_lookups() {
        assert!(describe(0x03, 0).is_none(), "string descriptors");
        assert!(describe(0x06, 0).is_none(), "device qualifier");
        assert!(describe(0x01, 1).is_none());
        assert!(describe(0x02, 1).is_none());
    }
}
