//! Ambient per-request event: cancellation signal and background work.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Metadata and lifecycle hooks that accompany a request through dispatch.
///
/// The dispatcher only forwards the event to handlers. It never cancels or awaits
/// anything on it; handlers that run long work should check
/// [`is_cancelled`](Self::is_cancelled) or race against [`cancelled`](Self::cancelled).
///
/// # Examples
///
/// ```rust,no_run
/// use pathchain::context::Event;
///
/// # async fn example() {
/// let event = Event::new().with_source_page("/dashboard");
/// event.wait_until(async {
///     // flush analytics after the response is produced
/// });
/// event.settle().await;
/// # }
/// ```
#[derive(Debug)]
pub struct Event {
    source_page: Option<String>,
    cancel: watch::Sender<bool>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl Event {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            source_page: None,
            cancel,
            pending: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_source_page(mut self, page: impl Into<String>) -> Self {
        self.source_page = Some(page.into());
        self
    }

    /// The page or route the host attributes this request to, if it knows one.
    pub fn source_page(&self) -> Option<&str> {
        self.source_page.as_deref()
    }

    /// Signal cancellation to every handler observing this event. Idempotent.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Spawn `work` on the current tokio runtime and keep it alive past the handler.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(work);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Number of background tasks registered and not yet settled.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Await every task registered through [`wait_until`](Self::wait_until).
    pub async fn settle(&self) {
        let handles = std::mem::take(
            &mut *self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task did not complete");
            }
        }
    }
}
