//! # pole-display
//!
//! Driver for serial-attached customer pole displays (PD-LED8 style) used at
//! point-of-sale terminals.
//!
//! The crate turns high-level intents ("show this text", "light the Total
//! lamp") into the display's escape-sequence commands and manages the serial
//! connection they travel over:
//!
//! - [`command`] encodes intents to bytes (pure, no I/O)
//! - [`Scheduler`] decides when bytes are written: text is debounced,
//!   indicators go out immediately
//! - [`ConnectionManager`] acquires, initializes and releases the port
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pole_display::{ConnectionManager, DisplayConfig, Indicator};
//! use pole_display::serial::SerialTransport;
//!
//! let config = DisplayConfig::default().with_port("/dev/ttyUSB0");
//! let mut display = ConnectionManager::new(SerialTransport::from_config(&config), config);
//! display.connect().await?;
//!
//! let scheduler = display.scheduler();
//! for partial in ["1", "12", "12.", "12.5", "12.50"] {
//!     scheduler.set_text(partial)?; // only "12.50" is written
//! }
//! scheduler.set_indicator(Indicator::Total).await?;
//! ```
//!
//! ## Protocol
//!
//! | Command | Bytes | When |
//! |---------|-------|------|
//! | Initialize | `ESC @` | once, right after connect |
//! | Clear screen | `0x0C` | once, right after initialize |
//! | Line 1 text | `ESC Q A <text> CR` | after the text quiet period |
//! | Indicator | `ESC s <digit>` | immediately |
//!
//! The protocol is write-only; nothing is read back from the device.
//!
//! ## Feature Flags
//!
//! - `serial` - Native serial port transport (via `serialport`)
//! - `yaml` - Load [`DisplayConfig`] from YAML
//! - `full` - All features

pub mod command;
mod config;
mod connection;
pub mod debounce;
mod error;
mod scheduler;
pub mod transport;

pub use command::Indicator;
pub use config::{DisplayConfig, PORT_ENV_VAR};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{Error, LastError};
pub use scheduler::{DisplayState, Link, Scheduler};
pub use transport::{Sink, Transport, TransportError};

/// Baud rate the display expects
pub const DEFAULT_BAUD_RATE: u32 = 2400;

/// Text debounce quiet period in milliseconds
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 300;

// Optional modules
#[cfg(feature = "serial")]
pub mod serial;
#[cfg(feature = "serial")]
pub use serial::SerialTransport;
