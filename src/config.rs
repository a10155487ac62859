//! Driver configuration.
//!
//! # Example (YAML, requires the `yaml` feature)
//!
//! ```yaml
//! baud_rate: 2400
//! quiet_period_ms: 300
//! port: /dev/ttyUSB0
//! resync_on_connect: true
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::{DEFAULT_BAUD_RATE, DEFAULT_QUIET_PERIOD_MS};

/// Environment variable naming the preferred serial device.
pub const PORT_ENV_VAR: &str = "POLE_DISPLAY_PORT";

/// Configuration for a pole display connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Link speed (default: 2400)
    pub baud_rate: u32,

    /// Text debounce quiet period in milliseconds (default: 300)
    pub quiet_period_ms: u64,

    /// Preferred device path, e.g. `/dev/ttyUSB0` or `COM3`.
    ///
    /// Defaults to `$POLE_DISPLAY_PORT`. When unset the transport picks a device itself.
    pub port: Option<String>,

    /// Replay the last requested text and indicator after reconnecting (default: false)
    pub resync_on_connect: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            port: std::env::var(PORT_ENV_VAR).ok().filter(|p| !p.is_empty()),
            resync_on_connect: false,
        }
    }
}

impl DisplayConfig {
    /// Set the baud rate.
    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the text debounce quiet period.
    #[must_use]
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period_ms = u64::try_from(quiet_period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the preferred device path.
    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Enable or disable replaying display state after reconnect.
    #[must_use]
    pub fn with_resync_on_connect(mut self, resync: bool) -> Self {
        self.resync_on_connect = resync;
        self
    }

    /// Text debounce quiet period.
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

#[cfg(feature = "yaml")]
impl DisplayConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string. Missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::Error> {
        serde_yaml::from_str(yaml)
            .map_err(|e| crate::Error::Config(format!("Invalid config YAML: {}", e)))
    }
}
