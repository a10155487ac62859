//! Transmission scheduling.
//!
//! Two independent channels feed the single active sink:
//!
//! - **Text**: debounced. Keystroke-rate updates are coalesced and only the
//!   latest value is written once the quiet period passes with no new input.
//! - **Indicator**: immediate. Every change is written as soon as it arrives,
//!   with no coalescing.
//!
//! Every command is written while holding the sink mutex, so commands from
//! the two channels never interleave mid-sequence.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::command::{self, Indicator};
use crate::debounce::Debouncer;
use crate::error::{Error, LastError};
use crate::transport::{Sink, TransportError};

/// The single active sink, owned by the connection manager and lent to the scheduler.
///
/// Empty while disconnected; any write attempted then fails with [`Error::NotConnected`].
pub struct Link<S> {
    sink: Arc<AsyncMutex<Option<S>>>,
    errors: LastError,
}

impl<S> Clone for Link<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            errors: self.errors.clone(),
        }
    }
}

impl<S: Sink> Link<S> {
    /// Create an empty link reporting failures into `errors`.
    pub fn new(errors: LastError) -> Self {
        Self {
            sink: Arc::new(AsyncMutex::new(None)),
            errors,
        }
    }

    /// Whether a sink is currently attached.
    pub async fn is_attached(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    pub(crate) async fn attach(&self, sink: S) {
        *self.sink.lock().await = Some(sink);
    }

    /// Remove the sink. Waits for any write in progress to finish first.
    pub(crate) async fn detach(&self) -> Option<S> {
        self.sink.lock().await.take()
    }

    /// Remove the sink without waiting. Returns `None` if a write holds it.
    pub(crate) fn try_detach(&self) -> Option<S> {
        self.sink.try_lock().ok().and_then(|mut guard| guard.take())
    }

    pub(crate) fn errors(&self) -> &LastError {
        &self.errors
    }

    /// Write `commands` back to back as one atomic unit.
    ///
    /// Success clears the last error, failure overwrites it.
    pub(crate) async fn send(&self, commands: &[&[u8]]) -> Result<(), Error> {
        let result = self.write(commands).await;
        self.record(&result);
        result
    }

    /// Like [`Link::send`] but leaves the last error untouched.
    async fn write(&self, commands: &[&[u8]]) -> Result<(), Error> {
        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => write_all(sink, commands).await.map_err(Error::write),
            None => Err(Error::NotConnected),
        }
    }

    fn record(&self, result: &Result<(), Error>) {
        match result {
            Ok(()) => self.errors.clear(),
            Err(e) => {
                tracing::warn!("Failed to write to display: {}", e);
                self.errors.set(e);
            }
        }
    }
}

async fn write_all<S: Sink>(sink: &mut S, commands: &[&[u8]]) -> Result<(), TransportError> {
    for bytes in commands {
        sink.write(bytes).await?;
        tracing::debug!("Wrote {} bytes: {:02X?}", bytes.len(), bytes);
    }
    Ok(())
}

/// Latest values requested by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// Last text passed to [`Scheduler::set_text`]
    pub text: Option<String>,
    /// Last indicator passed to [`Scheduler::set_indicator`]
    pub indicator: Option<Indicator>,
}

type TextFlush = Box<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Decides when encoded commands are written to the display.
///
/// Inactive until the connection manager finishes initializing the device.
pub struct Scheduler<S> {
    link: Link<S>,
    active: Arc<AtomicBool>,
    state: Mutex<DisplayState>,
    text: Debouncer<String, TextFlush>,
}

impl<S: Sink> Scheduler<S> {
    /// Create an inactive scheduler writing through `link`.
    pub fn new(link: Link<S>, quiet_period: Duration) -> Self {
        let active = Arc::new(AtomicBool::new(false));

        let flush: TextFlush = {
            let link = link.clone();
            let active = Arc::clone(&active);
            Box::new(move |text: String| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                let link = link.clone();
                let active = Arc::clone(&active);
                Box::pin(async move {
                    if !active.load(Ordering::Acquire) {
                        tracing::debug!("Dropping text flush, channel inactive");
                        return;
                    }
                    let result = link.write(&[&command::set_text(&text)]).await;
                    // A disconnect may detach the sink after this flush committed
                    let detached = matches!(result, Err(Error::NotConnected));
                    if detached && !active.load(Ordering::Acquire) {
                        tracing::debug!("Dropping text flush, display disconnected");
                        return;
                    }
                    link.record(&result);
                    if result.is_ok() {
                        tracing::info!("Sent {:?} to display", text);
                    }
                })
            })
        };

        Self {
            link,
            active,
            state: Mutex::new(DisplayState::default()),
            text: Debouncer::new(quiet_period, flush),
        }
    }

    /// Request new line-1 text.
    ///
    /// The write happens once no newer text has arrived for the quiet
    /// period. Fails fast with [`Error::NotConnected`] while inactive.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set_text(&self, text: impl Into<String>) -> Result<(), Error> {
        self.ensure_active()?;
        let text = text.into();
        self.state.lock().text = Some(text.clone());
        self.text.push(text);
        Ok(())
    }

    /// Light `indicator` right away.
    ///
    /// Failures are recorded as the last error; the scheduler keeps accepting
    /// intents afterwards.
    pub async fn set_indicator(&self, indicator: Indicator) -> Result<(), Error> {
        self.ensure_active()?;
        self.state.lock().indicator = Some(indicator);
        self.link
            .send(&[&command::set_indicator(indicator)])
            .await?;
        tracing::info!("Sent indicator command: {} ({})", indicator.code(), indicator);
        Ok(())
    }

    /// Latest requested text and indicator.
    pub fn state(&self) -> DisplayState {
        self.state.lock().clone()
    }

    /// Whether the channels currently accept intents.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether a text update is waiting for its quiet period.
    pub fn is_text_pending(&self) -> bool {
        self.text.is_pending()
    }

    pub(crate) fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Stop accepting intents and drop any pending text.
    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        if self.text.cancel() {
            tracing::debug!("Cancelled pending text update");
        }
    }

    /// Re-send the remembered indicator and text after a reconnect.
    ///
    /// Returns the indicator write's result; the text goes through the
    /// debounce as usual.
    pub(crate) async fn resync(&self) -> Result<(), Error> {
        let DisplayState { text, indicator } = self.state();
        let replayed = match indicator {
            Some(indicator) => self.set_indicator(indicator).await,
            None => Ok(()),
        };
        if let Some(text) = text {
            self.set_text(text)?;
        }
        replayed
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.is_active() {
            Ok(())
        } else {
            let err = Error::NotConnected;
            self.link.errors().set(&err);
            Err(err)
        }
    }
}
