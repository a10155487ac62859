//! Trailing-edge debounced channel.
//!
//! Every [`Debouncer::push`] restarts a countdown. Only when the countdown
//! runs out without another push is the latest value flushed; superseded
//! values are dropped without ever reaching the flush function.
//!
//! The countdown is a spawned Tokio task. Cancelling aborts the task while it
//! is still sleeping, so a cancelled flush never runs at all. Once the
//! countdown has elapsed the task commits (removes itself from the slot) and
//! the flush runs to completion even if a newer value arrives meanwhile.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Slot {
    next_id: u64,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    id: u64,
    handle: JoinHandle<()>,
}

/// A debounced channel carrying values of type `T` to a flush function.
pub struct Debouncer<T, F> {
    quiet_period: Duration,
    flush: Arc<F>,
    slot: Arc<Mutex<Slot>>,
    _value: std::marker::PhantomData<fn(T)>,
}

impl<T, F, Fut> Debouncer<T, F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Create a channel that flushes through `flush` after `quiet_period` of silence.
    pub fn new(quiet_period: Duration, flush: F) -> Self {
        Self {
            quiet_period,
            flush: Arc::new(flush),
            slot: Arc::new(Mutex::new(Slot::default())),
            _value: std::marker::PhantomData,
        }
    }

    /// Submit a new value, replacing any value still waiting.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn push(&self, value: T) {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.pending.take() {
            previous.handle.abort();
            tracing::trace!("Debounce countdown restarted");
        }

        slot.next_id += 1;
        let id = slot.next_id;
        let shared = Arc::clone(&self.slot);
        let flush = Arc::clone(&self.flush);
        let quiet_period = self.quiet_period;

        // The slot lock is held until the handle is stored, so the task
        // cannot commit before it is registered.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            {
                let mut slot = shared.lock();
                if slot.pending.as_ref().map(|p| p.id) != Some(id) {
                    return;
                }
                slot.pending = None;
            }
            flush(value).await;
        });
        slot.pending = Some(Pending { id, handle });
    }

    /// Drop the waiting value, if any. Returns whether something was cancelled.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a countdown is currently running.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    /// The configured quiet period.
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }
}

impl<T, F> Drop for Debouncer<T, F> {
    fn drop(&mut self) {
        if let Some(pending) = self.slot.lock().pending.take() {
            pending.handle.abort();
        }
    }
}

impl<T, F> std::fmt::Debug for Debouncer<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("quiet_period", &self.quiet_period)
            .field("pending", &self.slot.lock().pending.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    type Flushed = Arc<Mutex<Vec<(&'static str, Instant)>>>;

    fn recording_debouncer(
        quiet_ms: u64,
    ) -> (
        Debouncer<&'static str, impl Fn(&'static str) -> std::future::Ready<()> + Send + Sync>,
        Flushed,
    ) {
        let flushed: Flushed = Arc::default();
        let sink = Arc::clone(&flushed);
        let debouncer = Debouncer::new(
            Duration::from_millis(quiet_ms),
            move |value: &'static str| {
                sink.lock().push((value, Instant::now()));
                std::future::ready(())
            },
        );
        (debouncer, flushed)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_flushes_last_value_once() {
        let (debouncer, flushed) = recording_debouncer(300);

        let start = Instant::now();
        for value in ["H", "He", "Hel", "Hell", "Hello"] {
            debouncer.push(value);
            sleep(Duration::from_millis(100)).await;
        }
        assert!(flushed.lock().is_empty());

        sleep(Duration::from_millis(500)).await;
        let flushed = flushed.lock();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].0, "Hello");
        // Measured from the last push, not the first
        let last_push = start + Duration::from_millis(400);
        let waited = flushed[0].1 - last_push;
        assert!(waited >= Duration::from_millis(300));
        assert!(waited < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_value_discards_stale_countdown() {
        let (debouncer, flushed) = recording_debouncer(300);

        debouncer.push("stale");
        sleep(Duration::from_millis(200)).await;
        debouncer.push("fresh");

        // Past the point where the first countdown would have fired
        sleep(Duration::from_millis(200)).await;
        assert!(flushed.lock().is_empty());

        sleep(Duration::from_millis(150)).await;
        let values: Vec<_> = flushed.lock().iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec!["fresh"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_gaps_flush_every_value() {
        let (debouncer, flushed) = recording_debouncer(300);

        debouncer.push("one");
        sleep(Duration::from_millis(400)).await;
        debouncer.push("two");
        sleep(Duration::from_millis(400)).await;

        let values: Vec<_> = flushed.lock().iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec!["one", "two"]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_flush() {
        let (debouncer, flushed) = recording_debouncer(300);

        debouncer.push("never");
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());
        assert!(!debouncer.is_pending());
        assert!(!debouncer.cancel());

        sleep(Duration::from_secs(1)).await;
        assert!(flushed.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let (debouncer, flushed) = recording_debouncer(300);
        debouncer.push("never");
        drop(debouncer);

        sleep(Duration::from_secs(1)).await;
        assert!(flushed.lock().is_empty());
    }
}
