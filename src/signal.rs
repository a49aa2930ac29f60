//! Cooperative cancellation.
//!
//! An [`AbortController`] owns the right to cancel; the [`AbortSignal`]s it
//! hands out are cheap clones that work can poll (`is_aborted`, `check`)
//! or await (`aborted`).

use crate::error::{CompressionError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct AbortState {
    aborted: AtomicBool,
    notify: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct AbortController {
    state: Arc<AbortState>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            state: Arc::clone(&self.state),
        }
    }

    /// Marks every signal from this controller as aborted. Repeated calls
    /// are no-ops.
    pub fn abort(&self) {
        if !self.state.aborted.swap(true, Ordering::SeqCst) {
            tracing::debug!("abort requested");
            self.state.notify.notify_waiters();
        }
    }
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    state: Arc<AbortState>,
}

impl AbortSignal {
    /// A signal that is already aborted.
    pub fn aborted_signal() -> Self {
        let controller = AbortController::new();
        controller.abort();
        controller.signal()
    }

    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::SeqCst)
    }

    /// `Err(Aborted)` once the signal has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(CompressionError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Resolves when the signal fires; immediately if it already has.
    pub async fn aborted(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking so an abort between the check and
            // the await is not missed.
            notified.as_mut().enable();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

/// Checks an optional signal.
pub fn check_signal(signal: Option<&AbortSignal>) -> Result<()> {
    signal.map_or(Ok(()), AbortSignal::check)
}
