//! Trigger aggregation (debounce).
//!
//! Each `schedule` aborts the previous pending timer and starts a new one.
//! Only the timer is cancellable: once `fire` has been called, whatever it
//! spawned runs independently of later schedules. Must be used from within a
//! Tokio runtime.

use core_events::{TRIGGERS_FIRED, TRIGGERS_SCHEDULED, TRIGGERS_SUPERSEDED};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug)]
pub struct TriggerAggregator {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl TriggerAggregator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `fire` once `delay` has elapsed without another `schedule` or `cancel`.
    pub fn schedule<F>(&mut self, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        TRIGGERS_SCHEDULED.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            TRIGGERS_FIRED.fetch_add(1, Ordering::Relaxed);
            fire();
        }));
    }

    /// Abort the pending timer, if any. Returns whether one was superseded.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                TRIGGERS_SUPERSEDED.fetch_add(1, Ordering::Relaxed);
                trace!(target: "live.trigger", "pending_trigger_superseded");
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TriggerAggregator {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
