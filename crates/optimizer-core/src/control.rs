//! Stop control shared between a run driver and its callers.
//!
//! A [`StopSignal`] is an atomic flag paired with a [`Notify`], shared in
//! an [`Arc`] between the driver task and whoever may cancel the run. The
//! driver waits on [`StopSignal::stopped`] alongside its tick timer, so a
//! cancellation wakes it immediately instead of at the next tick.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use optimizer_types::RunId;
use tokio::sync::Notify;

/// A one-way stop flag with async notification.
#[derive(Debug, Default)]
pub struct StopSignal {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes tasks waiting in [`stopped`](Self::stopped).
    notify: Notify,
}

impl StopSignal {
    /// Create a signal with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake every waiter.
    ///
    /// Returns `true` if this call made the request, `false` if a stop
    /// had already been requested.
    pub fn request_stop(&self) -> bool {
        let first = !self.stop_requested.swap(true, Ordering::AcqRel);
        self.notify.notify_waiters();
        first
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop has been requested.
    ///
    /// Returns immediately if one already has.
    pub async fn stopped(&self) {
        loop {
            let mut notified = pin!(self.notify.notified());
            // Register before checking the flag so a concurrent
            // `request_stop` cannot slip between the check and the await.
            notified.as_mut().enable();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }
}

/// Handle to a started run.
///
/// Dropping the handle does not cancel the run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    run_id: RunId,
    signal: Arc<StopSignal>,
}

impl RunHandle {
    /// Create a handle for `run_id` controlled by `signal`.
    pub const fn new(run_id: RunId, signal: Arc<StopSignal>) -> Self {
        Self { run_id, signal }
    }

    /// Identifier of the run.
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Record a cancellation request for the run.
    ///
    /// Returns `false` if cancellation was already requested. A `true`
    /// return does not mean the run was active: a request made after the
    /// run finished is ignored, so check the session snapshot for the
    /// run's final status.
    pub fn cancel(&self) -> bool {
        self.signal.request_stop()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_stop_requested()
    }
}
