//! US-layout character to USB HID usage mapping
//!
//! Reference: USB HID Usage Tables 1.12, Section 10 (Keyboard/Keypad Page)

/// USB HID key codes (Usage Page 0x07)
pub mod usb {
    pub const KEY_A: u8 = 0x04;

    // Numbers 1-9, 0 (0x1E - 0x27)
    pub const KEY_1: u8 = 0x1E;
    pub const KEY_0: u8 = 0x27;

    // Control keys
    pub const KEY_ENTER: u8 = 0x28;
    pub const KEY_TAB: u8 = 0x2B;
    pub const KEY_SPACE: u8 = 0x2C;
    pub const KEY_MINUS: u8 = 0x2D;
    pub const KEY_EQUAL: u8 = 0x2E;
    pub const KEY_LEFT_BRACKET: u8 = 0x2F;
    pub const KEY_RIGHT_BRACKET: u8 = 0x30;
    pub const KEY_BACKSLASH: u8 = 0x31;
    pub const KEY_SEMICOLON: u8 = 0x33;
    pub const KEY_APOSTROPHE: u8 = 0x34;
    pub const KEY_GRAVE: u8 = 0x35;
    pub const KEY_COMMA: u8 = 0x36;
    pub const KEY_PERIOD: u8 = 0x37;
    pub const KEY_SLASH: u8 = 0x38;
}

/// Left-shift bit in the report's modifier byte
pub const MOD_LEFT_SHIFT: u8 = 0x02;

/// A single key press: modifier bitmask plus usage code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub modifier: u8,
    pub usage: u8,
}

/// Map a character to its key stroke on a US layout.
///
/// Covers printable ASCII letters, digits and common punctuation; shifted
/// symbols and uppercase letters carry the left-shift modifier. Returns
/// `None` for anything unmapped.
pub fn lookup(c: char) -> Option<KeyStroke> {
    let shifted = |usage| KeyStroke {
        modifier: MOD_LEFT_SHIFT,
        usage,
    };
    let plain = |usage| KeyStroke { modifier: 0, usage };

    let stroke = match c {
        'a'..='z' => plain(usb::KEY_A + (c as u8 - b'a')),
        'A'..='Z' => shifted(usb::KEY_A + (c as u8 - b'A')),
        '1'..='9' => plain(usb::KEY_1 + (c as u8 - b'1')),
        '0' => plain(usb::KEY_0),

        '\n' => plain(usb::KEY_ENTER),
        '\t' => plain(usb::KEY_TAB),
        ' ' => plain(usb::KEY_SPACE),

        // Shifted digit row
        '!' => shifted(usb::KEY_1),
        '@' => shifted(usb::KEY_1 + 1),
        '#' => shifted(usb::KEY_1 + 2),
        '$' => shifted(usb::KEY_1 + 3),
        '%' => shifted(usb::KEY_1 + 4),
        '^' => shifted(usb::KEY_1 + 5),
        '&' => shifted(usb::KEY_1 + 6),
        '*' => shifted(usb::KEY_1 + 7),
        '(' => shifted(usb::KEY_1 + 8),
        ')' => shifted(usb::KEY_0),

        // Punctuation pairs
        '-' => plain(usb::KEY_MINUS),
        '_' => shifted(usb::KEY_MINUS),
        '=' => plain(usb::KEY_EQUAL),
        '+' => shifted(usb::KEY_EQUAL),
        '[' => plain(usb::KEY_LEFT_BRACKET),
        '{' => shifted(usb::KEY_LEFT_BRACKET),
        ']' => plain(usb::KEY_RIGHT_BRACKET),
        '}' => shifted(usb::KEY_RIGHT_BRACKET),
        '\\' => plain(usb::KEY_BACKSLASH),
        '|' => shifted(usb::KEY_BACKSLASH),
        ';' => plain(usb::KEY_SEMICOLON),
        ':' => shifted(usb::KEY_SEMICOLON),
        '\'' => plain(usb::KEY_APOSTROPHE),
        '"' => shifted(usb::KEY_APOSTROPHE),
        '`' => plain(usb::KEY_GRAVE),
        '~' => shifted(usb::KEY_GRAVE),
        ',' => plain(usb::KEY_COMMA),
        '<' => shifted(usb::KEY_COMMA),
        '.' => plain(usb::KEY_PERIOD),
        '>' => shifted(usb::KEY_PERIOD),
        '/' => plain(usb::KEY_SLASH),
        '?' => shifted(usb::KEY_SLASH),

        _ => return None,
    };
    Some(stroke)
}

/// Every character [`lookup`] maps. Handy for exhaustive tests.
#[cfg(test)]
pub(crate) fn supported_chars() -> impl Iterator<Item = char> {
    ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .chain("\n\t !@#$%^&*()-_=+[{]}\\|;:'\"`~,<.>/?".chars())
}
