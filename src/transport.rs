//! Byte-stream transport boundary.
//!
//! The driver never touches a port directly. A [`Transport`] hands out device
//! handles and write-only [`Sink`]s, and the connection manager drives it
//! through `request_device -> open -> writer -> ... -> release_lock -> close`.
//!
//! The futures returned here must be `Send` so the scheduler can write from
//! spawned tasks on a multi-threaded runtime.

use std::future::Future;

use thiserror::Error;

/// Errors raised by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No serial capability on this host.
    #[error("Serial transport not supported on this platform")]
    NotSupported,

    /// The user (or the port lookup) did not yield a device.
    #[error("No device selected")]
    Cancelled,

    /// The device was found but could not be opened.
    #[error("Failed to open port: {0}")]
    OpenFailed(String),

    /// The handle has already been closed or released.
    #[error("Port not open")]
    NotOpen,

    /// Read/write level failure.
    #[error("IO error: {0}")]
    Io(String),
}

/// Platform capability for acquiring and releasing a byte stream.
pub trait Transport: Send {
    /// Handle to a selected (possibly not yet open) device.
    type Port: Send;

    /// Write half obtained from an open port.
    type Sink: Sink;

    /// Whether this host can provide serial ports at all.
    ///
    /// Checked before anything else so a missing capability is reported
    /// distinctly from a runtime failure.
    fn is_supported(&self) -> bool;

    /// Ask for a device. Fails with [`TransportError::Cancelled`] if none is chosen.
    fn request_device(
        &mut self,
    ) -> impl Future<Output = Result<Self::Port, TransportError>> + Send;

    /// Open the device at `baud_rate`.
    fn open(
        &mut self,
        port: &mut Self::Port,
        baud_rate: u32,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Take the exclusive writer for an open port.
    fn writer(&mut self, port: &mut Self::Port) -> Result<Self::Sink, TransportError>;

    /// Close the port.
    fn close(&mut self, port: Self::Port) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Write-only handle to an open byte stream.
pub trait Sink: Send + 'static {
    /// Write one complete command.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Give up exclusive write access.
    fn release_lock(&mut self) -> Result<(), TransportError>;
}
