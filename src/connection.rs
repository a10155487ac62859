//! Connection lifecycle.
//!
//! [`ConnectionManager`] is the only owner of the port, the sink and the
//! [`ConnectionState`]. Observers get a read-only view through
//! [`ConnectionManager::state`] or a [`watch`] subscription.
//!
//! ```text
//! Disconnected --connect()--> Connected --disconnect()--> Disconnected
//!       ^                        |
//!       +---- open failure ------+ (state never leaves Disconnected)
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use crate::command;
use crate::config::DisplayConfig;
use crate::error::{Error, LastError};
use crate::scheduler::{Link, Scheduler};
use crate::transport::{Sink, Transport, TransportError};

/// Whether a display is currently attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No sink; writes fail with [`Error::NotConnected`]
    #[default]
    Disconnected,
    /// Sink attached and device initialized
    Connected,
}

/// Publishes `Disconnected` when dropped, whatever path teardown took.
struct DisconnectGuard<'a> {
    state: &'a watch::Sender<ConnectionState>,
}

impl Drop for DisconnectGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

/// Owns the connection to one pole display.
///
/// # Example
///
/// ```rust,ignore
/// use pole_display::{ConnectionManager, DisplayConfig, Indicator};
/// use pole_display::serial::SerialTransport;
///
/// let config = DisplayConfig::default();
/// let mut display = ConnectionManager::new(SerialTransport::from_config(&config), config);
/// display.connect().await?;
///
/// let scheduler = display.scheduler();
/// scheduler.set_text("TOTAL   12.50")?;
/// scheduler.set_indicator(Indicator::Total).await?;
///
/// display.disconnect().await;
/// ```
pub struct ConnectionManager<T: Transport> {
    transport: T,
    config: DisplayConfig,
    port: Option<T::Port>,
    link: Link<T::Sink>,
    scheduler: Arc<Scheduler<T::Sink>>,
    state: watch::Sender<ConnectionState>,
    errors: LastError,
    /// Whether the device accepted `ESC @` and the form feed on this connection
    initialized: bool,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a disconnected manager.
    pub fn new(transport: T, config: DisplayConfig) -> Self {
        let errors = LastError::new();
        let link = Link::new(errors.clone());
        let scheduler = Arc::new(Scheduler::new(link.clone(), config.quiet_period()));
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            transport,
            config,
            port: None,
            link,
            scheduler,
            state,
            errors,
            initialized: false,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Shorthand for `state() == Connected`.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Most recent failure message, if the last operation failed.
    pub fn last_error(&self) -> Option<String> {
        self.errors.get()
    }

    /// The scheduler that accepts text and indicator intents.
    pub fn scheduler(&self) -> Arc<Scheduler<T::Sink>> {
        Arc::clone(&self.scheduler)
    }

    /// Active configuration.
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Select, open and initialize the display.
    ///
    /// On success the device has received `ESC @` followed by a form feed
    /// and the scheduler accepts intents. If the port cannot be acquired the
    /// state stays `Disconnected`. If the port opens but the initialization
    /// writes fail, the state is `Connected` and a [`Error::Write`] is returned;
    /// calling `connect` again retries the initialization on the open port.
    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.is_connected() {
            if self.initialized {
                tracing::debug!("Connect requested while already connected");
                return Ok(());
            }
            tracing::debug!("Retrying display initialization");
            return self.initialize().await;
        }

        if !self.transport.is_supported() {
            let err = Error::UnsupportedPlatform;
            tracing::warn!("{}", err);
            self.errors.set(&err);
            return Err(err);
        }
        self.errors.clear();

        let (port, sink) = match self.acquire().await {
            Ok(acquired) => acquired,
            Err(err) => {
                tracing::warn!("There was an error opening the serial port: {}", err);
                self.errors.set(&err);
                return Err(err);
            }
        };

        self.port = Some(port);
        self.link.attach(sink).await;
        self.state.send_replace(ConnectionState::Connected);
        self.initialize().await
    }

    /// Send the init pair over the attached sink and open the channels.
    ///
    /// Remembered state is replayed only after a successful initialization,
    /// so the last error always reflects the result returned here.
    async fn initialize(&mut self) -> Result<(), Error> {
        let init = self
            .link
            .send(&[&command::initialize(), &command::clear()])
            .await;
        self.initialized = init.is_ok();
        if self.initialized {
            tracing::info!(
                "Display connected and initialized at {} baud",
                self.config.baud_rate
            );
        }

        self.scheduler.activate();
        if self.initialized && self.config.resync_on_connect {
            return self.scheduler.resync().await;
        }
        init
    }

    /// Release the writer and close the port.
    ///
    /// Never fails. Errors releasing or closing are logged and skipped, and the
    /// state always ends up `Disconnected` with no sink. Calling this while
    /// already disconnected does nothing.
    pub async fn disconnect(&mut self) {
        self.initialized = false;
        self.scheduler.deactivate();
        let sink = self.link.detach().await;
        let port = self.port.take();

        if sink.is_none() && port.is_none() {
            tracing::debug!("Disconnect requested while not connected");
            self.state.send_if_modified(|state| {
                let changed = *state != ConnectionState::Disconnected;
                *state = ConnectionState::Disconnected;
                changed
            });
            return;
        }

        let _guard = DisconnectGuard { state: &self.state };

        if let Some(mut sink) = sink {
            log_teardown("releasing writer lock", sink.release_lock());
        }
        if let Some(port) = port {
            log_teardown("closing port", self.transport.close(port).await);
        }

        tracing::info!("Display disconnected");
    }

    /// Request, open and take the writer of a device.
    async fn acquire(&mut self) -> Result<(T::Port, T::Sink), Error> {
        let mut port = self.transport.request_device().await.map_err(Error::open)?;
        self.transport
            .open(&mut port, self.config.baud_rate)
            .await
            .map_err(Error::open)?;

        match self.transport.writer(&mut port) {
            Ok(sink) => Ok((port, sink)),
            Err(err) => {
                log_teardown("closing port", self.transport.close(port).await);
                Err(Error::open(err))
            }
        }
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        self.scheduler.deactivate();
        if let Some(mut sink) = self.link.try_detach() {
            log_teardown("releasing writer lock", sink.release_lock());
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

fn log_teardown(step: &str, result: Result<(), TransportError>) {
    if let Err(err) = result {
        let err = Error::Teardown(format!("{}: {}", step, err));
        tracing::warn!("{}", err);
    }
}
