//! HID report descriptor for the boot keyboard function

/// Input report length declared by [`KEYBOARD`]
pub const KEYBOARD_REPORT_LENGTH: usize = 8;

/// Boot keyboard HID report descriptor
/// Report format (8 bytes input):
///   [0] Modifier keys (8 bits)
///   [1] Reserved
///   [2-7] Key codes (6 keys)
pub const KEYBOARD: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    // Modifier keys input (8 bits)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224) - Left Control
    0x29, 0xE7, //   Usage Maximum (231) - Right GUI
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute) - Modifier byte
    // Reserved byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x03, //   Input (Constant) - Reserved byte
    // Key array (6 bytes)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x81, 0x00, //   Input (Data, Array) - Key array (6 keys)
    0xC0, // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_well_formed() {
        assert!(!KEYBOARD.is_empty());
        // Collection open/close balance
        assert_eq!(KEYBOARD[0], 0x05);
        assert_eq!(*KEYBOARD.last().unwrap(), 0xC0);
    }
}
