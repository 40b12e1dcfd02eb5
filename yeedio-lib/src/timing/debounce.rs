//! Coalescing of bursty triggers into one delayed run.

use std::time::Duration;

use super::scheduler::{Scheduler, TimerHandle};

/// Collapses triggers that arrive while a run is already pending.
///
/// The first trigger schedules the action `delay` later; any trigger that
/// arrives before it fires is absorbed. Once the action has run, the next
/// trigger starts a new window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TimerHandle>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` unless a run is already pending.
    ///
    /// Returns `true` when a new run was scheduled.
    pub fn trigger<F>(&mut self, scheduler: &Scheduler, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_pending(scheduler) {
            return false;
        }
        self.pending = Some(scheduler.set_timeout(self.delay, action));
        true
    }

    /// Return true while a scheduled run has not fired yet.
    pub fn is_pending(&self, scheduler: &Scheduler) -> bool {
        self.pending
            .map(|handle| scheduler.is_live(handle))
            .unwrap_or(false)
    }

    /// Drop a pending run without executing it.
    pub fn cancel(&mut self, scheduler: &Scheduler) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel(handle);
        }
    }
}
