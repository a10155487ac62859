//! Error types for the pole display driver.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while driving a pole display.
#[derive(Debug, Error)]
pub enum Error {
    /// The host has no serial transport capability at all.
    #[error("Serial transport not supported on this platform")]
    UnsupportedPlatform,

    /// Device selection was cancelled, or the port could not be opened.
    #[error("Failed to open display: {0}")]
    DeviceOpen(String),

    /// A command could not be written to an established connection.
    #[error("Failed to write to display: {0}")]
    Write(String),

    /// Releasing the writer or closing the port failed during disconnect.
    ///
    /// Only ever logged; never returned from `disconnect`.
    #[error("Teardown failed: {0}")]
    Teardown(String),

    /// A write was attempted with no active connection.
    #[error("Display not connected")]
    NotConnected,

    /// Indicator code outside `0..=4`.
    #[error("Invalid indicator code {0} (expected 0-4)")]
    InvalidIndicator(u8),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify a transport failure raised while acquiring the device.
    pub(crate) fn open(err: TransportError) -> Self {
        match err {
            TransportError::NotSupported => Error::UnsupportedPlatform,
            other => Error::DeviceOpen(other.to_string()),
        }
    }

    /// Classify a transport failure raised while sending a command.
    pub(crate) fn write(err: TransportError) -> Self {
        match err {
            TransportError::NotOpen => Error::NotConnected,
            other => Error::Write(other.to_string()),
        }
    }
}

/// The most recent failure, shared between the connection manager and the scheduler.
///
/// Holds at most one message. New failures overwrite the previous one and
/// successful operations clear it.
#[derive(Debug, Clone, Default)]
pub struct LastError {
    inner: Arc<Mutex<Option<String>>>,
}

impl LastError {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current message with `err`.
    pub fn set(&self, err: &Error) {
        *self.inner.lock() = Some(err.to_string());
    }

    /// Clear the current message.
    pub fn clear(&self) {
        *self.inner.lock() = None;
    }

    /// Get a copy of the current message, if any.
    pub fn get(&self) -> Option<String> {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DeviceOpen("No port selected".to_string());
        assert!(err.to_string().contains("No port selected"));

        let err = Error::InvalidIndicator(7);
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_transport_error_classification() {
        assert!(matches!(
            Error::open(TransportError::NotSupported),
            Error::UnsupportedPlatform
        ));
        assert!(matches!(
            Error::open(TransportError::Cancelled),
            Error::DeviceOpen(_)
        ));
        assert!(matches!(
            Error::write(TransportError::NotOpen),
            Error::NotConnected
        ));
        assert!(matches!(
            Error::write(TransportError::Io("unplugged".into())),
            Error::Write(msg) if msg.contains("unplugged")
        ));
    }

    #[test]
    fn test_last_error_overwrites() {
        let slot = LastError::new();
        assert_eq!(slot.get(), None);

        slot.set(&Error::UnsupportedPlatform);
        slot.set(&Error::Write("first".to_string()));
        slot.set(&Error::Write("second".to_string()));
        let msg = slot.get().unwrap();
        assert!(msg.contains("second"));
        assert!(!msg.contains("first"));

        // Clones share the same slot
        let other = slot.clone();
        other.clear();
        assert_eq!(slot.get(), None);
    }
}
