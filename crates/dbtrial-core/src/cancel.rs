//! Cooperative cancellation of a benchmark run.
//!
//! Cancellation is observed between trials and during the inter-trial
//! pause. A query already sent to the backend always runs to completion.

use std::time::Duration;

use tokio::sync::watch;

/// Triggers cancellation for every [`CancelSignal`] cloned from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Create a signal observing this handle.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a cancellation request.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until cancellation is requested.
    ///
    /// Never resolves if the handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Sleep for `pause`, returning early with `false` if cancelled.
pub(crate) async fn pause(duration: Duration, cancel: Option<&mut CancelSignal>) -> bool {
    match cancel {
        None => {
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
            true
        }
        Some(signal) => {
            if signal.is_cancelled() {
                return false;
            }
            if duration.is_zero() {
                return true;
            }
            tokio::select! {
                _ = tokio::time::sleep(duration) => true,
                _ = signal.cancelled() => false,
            }
        }
    }
}
