//! Native serial port transport.
//!
//! Device selection picks the configured port if there is one, otherwise the
//! first port the OS reports. Ports are opened 8N1 with no flow control.
//!
//! `serialport` is blocking, so opening and writing run on Tokio's blocking
//! pool. At 2400 baud a full line takes several tens of milliseconds.

use std::io::Write;
use std::time::Duration;

use serialport::SerialPort;

use crate::config::DisplayConfig;
use crate::transport::{Sink, Transport, TransportError};

/// Write timeout for a single command.
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// [`Transport`] over the host's serial ports.
#[derive(Debug, Clone, Default)]
pub struct SerialTransport {
    preferred: Option<String>,
}

impl SerialTransport {
    /// Create a transport that auto-selects the first available port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that always selects `port` (e.g. `/dev/ttyUSB0`).
    pub fn with_port(port: impl Into<String>) -> Self {
        Self {
            preferred: Some(port.into()),
        }
    }

    /// Create a transport using the port from `config`, if set.
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            preferred: config.port.clone(),
        }
    }

    /// Names of the serial ports currently present.
    pub fn list_ports() -> Result<Vec<String>, TransportError> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

/// A selected serial device, open once [`Transport::open`] succeeds.
pub struct SerialDevice {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialDevice {
    /// OS name of the device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the device has been opened.
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Transport for SerialTransport {
    type Port = SerialDevice;
    type Sink = SerialSink;

    fn is_supported(&self) -> bool {
        serialport::available_ports().is_ok()
    }

    async fn request_device(&mut self) -> Result<SerialDevice, TransportError> {
        let name = match &self.preferred {
            Some(name) => name.clone(),
            None => Self::list_ports()?
                .into_iter()
                .next()
                .ok_or(TransportError::Cancelled)?,
        };
        tracing::debug!("Selected serial device {}", name);
        Ok(SerialDevice { name, port: None })
    }

    async fn open(
        &mut self,
        device: &mut SerialDevice,
        baud_rate: u32,
    ) -> Result<(), TransportError> {
        let name = device.name.clone();
        tracing::debug!("Opening {} at {} baud", name, baud_rate);

        let port = tokio::task::spawn_blocking(move || {
            serialport::new(&name, baud_rate)
                .timeout(WRITE_TIMEOUT)
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None)
                .flow_control(serialport::FlowControl::None)
                .open()
                .map_err(|e| TransportError::OpenFailed(format!("{}: {}", name, e)))
        })
        .await
        .map_err(|e| TransportError::OpenFailed(e.to_string()))??;

        device.port = Some(port);
        Ok(())
    }

    fn writer(&mut self, device: &mut SerialDevice) -> Result<SerialSink, TransportError> {
        let port = device.port.as_ref().ok_or(TransportError::NotOpen)?;
        let clone = port
            .try_clone()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(SerialSink {
            name: device.name.clone(),
            port: Some(clone),
        })
    }

    async fn close(&mut self, mut device: SerialDevice) -> Result<(), TransportError> {
        // The OS handle is closed on drop
        match device.port.take() {
            Some(port) => {
                drop(port);
                tracing::debug!("Closed {}", device.name);
                Ok(())
            }
            None => Err(TransportError::NotOpen),
        }
    }
}

/// Write handle cloned from an open [`SerialDevice`].
pub struct SerialSink {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl std::fmt::Debug for SerialSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSink")
            .field("name", &self.name)
            .field("locked", &self.port.is_some())
            .finish()
    }
}

impl Sink for SerialSink {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut port = self.port.take().ok_or(TransportError::NotOpen)?;
        let buf = bytes.to_vec();

        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = port.write_all(&buf).and_then(|()| port.flush());
            (port, result)
        })
        .await
        .map_err(|e| TransportError::Io(e.to_string()))?;

        self.port = Some(port);
        result.map_err(|e| TransportError::Io(e.to_string()))
    }

    fn release_lock(&mut self) -> Result<(), TransportError> {
        self.port.take().map(drop).ok_or(TransportError::NotOpen)
    }
}
