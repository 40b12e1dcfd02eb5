//! Single-threaded timer queue.
//!
//! The agent's world is cooperative: a timer callback, element event or
//! message runs to completion before the next one starts. `Scheduler` keeps
//! that model explicit. Callbacks are queued with a due time and run either by
//! advancing virtual time ([`Scheduler::advance`]) or by pacing the queue
//! against the wall clock on the calling thread ([`Scheduler::run_for`]).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

/// Shortest period accepted for repeating timers.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

type OnceCallback = Box<dyn FnOnce() + Send>;
type RepeatingCallback = Arc<Mutex<Box<dyn FnMut() + Send>>>;

/// Identifier of a queued timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

enum TimerKind {
    Once(OnceCallback),
    Repeating {
        period: Duration,
        callback: RepeatingCallback,
    },
}

struct Timer {
    due: Duration,
    kind: TimerKind,
}

enum Ready {
    Once(OnceCallback),
    Repeating(RepeatingCallback),
}

struct TimerQueue {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<u64, Timer>,
}

impl TimerQueue {
    fn insert(&mut self, due: Duration, kind: TimerKind) -> TimerHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.timers.insert(id, Timer { due, kind });
        TimerHandle(id)
    }

    /// Pop the earliest timer due at or before `limit`.
    ///
    /// Repeating timers stay queued with their next due time.
    fn take_due(&mut self, limit: Duration) -> Option<Ready> {
        let (id, due) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= limit)
            .min_by_key(|(id, timer)| (timer.due, **id))
            .map(|(id, timer)| (*id, timer.due))?;

        self.now = self.now.max(due);

        let timer = self.timers.get_mut(&id)?;
        if let TimerKind::Repeating { period, callback } = &timer.kind {
            let callback = callback.clone();
            timer.due = due + *period;
            return Some(Ready::Repeating(callback));
        }

        match self.timers.remove(&id)?.kind {
            TimerKind::Once(callback) => Some(Ready::Once(callback)),
            TimerKind::Repeating { .. } => None,
        }
    }
}

/// Shared handle to a timer queue. Cloning shares the queue.
#[derive(Clone)]
pub struct Scheduler {
    queue: Arc<Mutex<TimerQueue>>,
}

impl Scheduler {
    /// Create an empty queue at time zero.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(TimerQueue {
                now: Duration::ZERO,
                next_id: 0,
                timers: BTreeMap::new(),
            })),
        }
    }

    /// Current scheduler time, measured from creation.
    pub fn now(&self) -> Duration {
        self.queue.lock().unwrap().now
    }

    /// Run `callback` once after `delay`.
    pub fn set_timeout<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.queue.lock().unwrap();
        let due = queue.now + delay;
        queue.insert(due, TimerKind::Once(Box::new(callback)))
    }

    /// Run `callback` every `period` until cancelled.
    ///
    /// Periods shorter than one millisecond are raised to one millisecond.
    pub fn set_interval<F>(&self, period: Duration, callback: F) -> TimerHandle
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(MIN_INTERVAL);
        let mut queue = self.queue.lock().unwrap();
        let due = queue.now + period;
        queue.insert(
            due,
            TimerKind::Repeating {
                period,
                callback: Arc::new(Mutex::new(Box::new(callback))),
            },
        )
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        self.queue.lock().unwrap().timers.remove(&handle.0).is_some()
    }

    /// Return true while `handle` is still queued.
    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.queue.lock().unwrap().timers.contains_key(&handle.0)
    }

    /// Number of queued timers, one-shot and repeating.
    pub fn live_timers(&self) -> usize {
        self.queue.lock().unwrap().timers.len()
    }

    /// Number of queued repeating timers.
    pub fn live_intervals(&self) -> usize {
        self.queue
            .lock()
            .unwrap()
            .timers
            .values()
            .filter(|timer| matches!(timer.kind, TimerKind::Repeating { .. }))
            .count()
    }

    /// Due time of the earliest queued timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue
            .lock()
            .unwrap()
            .timers
            .values()
            .map(|timer| timer.due)
            .min()
    }

    /// Advance virtual time by `by`, running every callback that falls due.
    ///
    /// Callbacks queued while advancing run in the same call if they fall due
    /// before the new time. Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let limit = self.now() + by;
        self.advance_to(limit)
    }

    /// Advance virtual time to `limit`. Times in the past only flush due work.
    pub fn advance_to(&self, limit: Duration) -> usize {
        let mut ran = 0;
        while self.run_next_due(limit) {
            ran += 1;
        }
        let mut queue = self.queue.lock().unwrap();
        queue.now = queue.now.max(limit);
        ran
    }

    /// Run queued callbacks for `span` of wall-clock time.
    ///
    /// The calling thread sleeps until each deadline, so this blocks for
    /// roughly `span`. Returns the number of callbacks run.
    pub fn run_for(&self, span: Duration) -> usize {
        let started = Instant::now();
        let base = self.now();
        let end = base + span;
        let mut ran = 0;

        loop {
            let target = match self.next_deadline() {
                Some(deadline) if deadline <= end => deadline,
                _ => end,
            };
            let wait = target.saturating_sub(base).saturating_sub(started.elapsed());
            if !wait.is_zero() {
                thread::sleep(wait);
            }
            ran += self.advance_to(target);
            if target >= end {
                break;
            }
        }

        debug!("scheduler ran {} callbacks in {:?}", ran, started.elapsed());
        ran
    }

    fn run_next_due(&self, limit: Duration) -> bool {
        let ready = self.queue.lock().unwrap().take_due(limit);
        match ready {
            Some(Ready::Once(callback)) => {
                callback();
                true
            }
            Some(Ready::Repeating(callback)) => {
                (callback.lock().unwrap())();
                true
            }
            None => false,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.queue.lock().unwrap();
        f.debug_struct("Scheduler")
            .field("now", &queue.now)
            .field("timers", &queue.timers.len())
            .finish()
    }
}
