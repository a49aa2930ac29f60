use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Progress callback receiving a percentage in `[0, 100]`.
pub type ProgressHandler = Arc<dyn Fn(f64) + Send + Sync>;

/// Wraps an optional [`ProgressHandler`] so callers only ever observe a
/// non-decreasing sequence of percentages. Values below the last forwarded
/// one are dropped; everything is clamped to `[0, 100]`.
///
/// Once [`close`](Self::close) returns, the handler is never called again.
/// The handler runs under the reporter's lock, so it must not report
/// through the same reporter.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    handler: Option<ProgressHandler>,
    state: Arc<Mutex<ProgressState>>,
}

#[derive(Debug, Default)]
struct ProgressState {
    last: Option<f64>,
    closed: bool,
}

impl ProgressReporter {
    pub fn new(handler: Option<ProgressHandler>) -> Self {
        Self {
            handler,
            state: Arc::new(Mutex::new(ProgressState::default())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handler.is_some()
    }

    pub fn report(&self, percent: f64) {
        let Some(handler) = &self.handler else {
            return;
        };
        if percent.is_nan() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);

        let mut state = self.state.lock();
        if state.closed || matches!(state.last, Some(prev) if percent < prev) {
            return;
        }
        state.last = Some(percent);
        handler(percent);
    }

    /// Reports `done / total` as a percentage.
    pub fn report_fraction(&self, done: u32, total: u32) {
        if total == 0 {
            return;
        }
        self.report(f64::from(done) * 100.0 / f64::from(total));
    }

    /// Stops forwarding. Waits for a handler call already in progress, so
    /// no call can land after this returns. Shared by all clones.
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn last_reported(&self) -> Option<f64> {
        self.state.lock().last
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.is_enabled())
            .field("last", &self.last_reported())
            .finish()
    }
}
