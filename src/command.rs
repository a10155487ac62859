//! Command encoding for the display's escape-sequence protocol.
//!
//! | Command | Bytes |
//! |---------|-------|
//! | Initialize | `ESC '@'` |
//! | Clear screen | `0x0C` |
//! | Set line-1 text | `ESC 'Q' 'A' <text> '\r'` |
//! | Set indicator | `ESC 's' <digit>` |
//!
//! All functions are pure. Text is sent as-is: an escape byte inside the
//! text is not escaped and the device behavior in that case is undefined.

use std::fmt;

use crate::error::Error;

/// Escape byte that starts every multi-byte command.
pub const ESC: u8 = 0x1B;

/// Form feed, clears the screen.
pub const FORM_FEED: u8 = 0x0C;

/// Mode selector for "write line A".
const SELECT_LINE_A: &[u8; 2] = b"QA";

/// Mode selector for "set indicator".
const SELECT_INDICATOR: u8 = b's';

/// Indicator lamp on the display.
///
/// Exactly one indicator is lit at a time; setting one replaces the previous.
///
/// # Example
///
/// ```
/// use pole_display::Indicator;
///
/// let total = Indicator::try_from(2).unwrap();
/// assert_eq!(total, Indicator::Total);
/// assert_eq!(total.code(), 2);
/// assert!(Indicator::try_from(5).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Indicator {
    /// All indicators off
    #[default]
    Off = 0,
    /// "Price" lamp
    Price = 1,
    /// "Total" lamp
    Total = 2,
    /// "Collect" lamp
    Collect = 3,
    /// "Change" lamp
    Change = 4,
}

impl Indicator {
    /// Every indicator, ordered by code.
    pub const ALL: [Indicator; 5] = [
        Indicator::Off,
        Indicator::Price,
        Indicator::Total,
        Indicator::Collect,
        Indicator::Change,
    ];

    /// Numeric code sent to the device.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Label shown on the physical lamp.
    pub fn name(self) -> &'static str {
        match self {
            Indicator::Off => "Off",
            Indicator::Price => "Price",
            Indicator::Total => "Total",
            Indicator::Collect => "Collect",
            Indicator::Change => "Change",
        }
    }
}

impl TryFrom<u8> for Indicator {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Indicator::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(Error::InvalidIndicator(code))
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device reset sequence. Sent once right after connecting.
pub fn initialize() -> Vec<u8> {
    vec![ESC, b'@']
}

/// Clear-screen sequence. Sent right after [`initialize`].
pub fn clear() -> Vec<u8> {
    vec![FORM_FEED]
}

/// Write `text` to the first line.
///
/// # Example
///
/// ```
/// use pole_display::command;
///
/// assert_eq!(command::set_text("Hi"), b"\x1bQAHi\r");
/// ```
pub fn set_text(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 4);
    bytes.push(ESC);
    bytes.extend_from_slice(SELECT_LINE_A);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(b'\r');
    bytes
}

/// Light a single indicator.
///
/// # Example
///
/// ```
/// use pole_display::{command, Indicator};
///
/// assert_eq!(command::set_indicator(Indicator::Total), b"\x1bs2");
/// ```
pub fn set_indicator(indicator: Indicator) -> Vec<u8> {
    let mut bytes = vec![ESC, SELECT_INDICATOR];
    bytes.extend_from_slice(indicator.code().to_string().as_bytes());
    bytes
}
