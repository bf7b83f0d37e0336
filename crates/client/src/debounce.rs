//! Trailing-edge debouncer.
//!
//! Holds at most one pending value. Each [`Debouncer::schedule`] aborts the
//! pending timer and starts a new one; a value that survives the quiet period
//! is delivered on the channel returned by [`Debouncer::new`].

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Delivers the last value scheduled once input has been quiet for a while.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    tx: UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its settled values arrive on.
    #[must_use]
    pub fn new(quiet: Duration) -> (Self, UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_sender(quiet, tx), rx)
    }

    /// Create a debouncer that delivers into an existing channel, so several
    /// debouncers can share one consumer.
    #[must_use]
    pub const fn with_sender(quiet: Duration, tx: UnboundedSender<T>) -> Self {
        Self {
            quiet,
            tx,
            pending: None,
        }
    }

    /// The quiet period.
    #[must_use]
    pub const fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Replace any pending value with `value` and restart the timer.
    pub fn schedule(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            // The receiver may be gone if the owner shut down
            let _ = tx.send(value);
        }));
    }

    /// Drop any pending value and deliver `value` immediately.
    pub fn fire_now(&mut self, value: T) {
        self.cancel();
        let _ = self.tx.send(value);
    }

    /// Drop the pending value, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some_and(|handle| {
            let was_pending = !handle.is_finished();
            handle.abort();
            was_pending
        })
    }

    /// Whether a value is waiting out its quiet period.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn test_only_last_value_delivered() {
        let (mut debouncer, mut rx) = Debouncer::new(QUIET);

        debouncer.schedule("d");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.schedule("da");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.schedule("dates");

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await.unwrap(), "dates");
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let (mut debouncer, mut rx) = Debouncer::new(QUIET);
        debouncer.schedule(1);
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(QUIET * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_now_replaces_pending() {
        let (mut debouncer, mut rx) = Debouncer::new(QUIET);
        debouncer.schedule(1);
        debouncer.fire_now(2);
        assert_eq!(rx.recv().await.unwrap(), 2);

        tokio::time::sleep(QUIET * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending() {
        let (mut debouncer, mut rx) = Debouncer::new(QUIET);
        debouncer.schedule(1);
        drop(debouncer);

        tokio::time::sleep(QUIET * 2).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_sender() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut a = Debouncer::with_sender(QUIET, tx.clone());
        let mut b = Debouncer::with_sender(QUIET, tx);
        a.schedule("a");
        b.schedule("b");

        tokio::time::sleep(QUIET + Duration::from_millis(1)).await;
        let mut got = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        got.sort_unstable();
        assert_eq!(got, vec!["a", "b"]);
    }
}
