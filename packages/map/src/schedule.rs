//! Deferred work and retry policy.
//!
//! Waiting for the map style and waiting out a retry delay are the same
//! thing here: a task parked in a [`Deferred`] queue under a [`Trigger`].
//! The owner releases tasks when the style becomes ready or when the
//! clock passes their deadline.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Source of the current time.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// What releases a deferred task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The map style finished loading.
    StyleReady,
    /// The clock reached this instant.
    At(Instant),
}

/// A queue of tasks waiting on triggers.
#[derive(Debug)]
pub struct Deferred<T> {
    entries: Vec<(Trigger, T)>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Deferred<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `task` until `trigger` fires.
    pub fn schedule(&mut self, trigger: Trigger, task: T) {
        self.entries.push((trigger, task));
    }

    /// Drops every parked task, returning how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Number of parked tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns the tasks waiting for the style, in order.
    pub fn take_style_ready(&mut self) -> Vec<T> {
        self.take_where(|trigger| matches!(trigger, Trigger::StyleReady))
    }

    /// Removes and returns the timed tasks due at `now`, in order.
    pub fn take_due(&mut self, now: Instant) -> Vec<T> {
        self.take_where(|trigger| matches!(trigger, Trigger::At(at) if *at <= now))
    }

    /// The earliest deadline among timed tasks.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .iter()
            .filter_map(|(trigger, _)| match trigger {
                Trigger::At(at) => Some(*at),
                Trigger::StyleReady => None,
            })
            .min()
    }

    fn take_where(&mut self, ready: impl Fn(&Trigger) -> bool) -> Vec<T> {
        let (released, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(trigger, _)| ready(trigger));
        self.entries = waiting;
        released.into_iter().map(|(_, task)| task).collect()
    }
}

/// Bounded retry with exponential backoff.
///
/// The first retry waits `delay_ms`; each later one multiplies the wait
/// by `backoff_factor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry, in milliseconds.
    pub delay_ms: u64,
    /// Multiplier applied per further retry.
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay_ms: 300,
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            delay_ms: 0,
            backoff_factor: 1,
        }
    }

    /// Wait before retry number `retry` (1-based), or `None` once the
    /// retries are used up.
    #[must_use]
    pub fn delay_before(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }
        let factor = u64::from(self.backoff_factor).saturating_pow(retry - 1);
        Some(Duration::from_millis(self.delay_ms.saturating_mul(factor)))
    }
}
