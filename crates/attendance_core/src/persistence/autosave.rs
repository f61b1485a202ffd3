//! Cancellable auto-save schedule.
//!
//! The schedule never runs anything itself: the owner polls it from its
//! event loop with the current instant and performs the save when a tick is
//! handed out.
//!
//! # Invariants
//! - At most one tick is in flight; no tick is handed out while one runs.
//! - The next tick is armed only when the in-flight one completes.
//! - After `cancel`, no tick is handed out until `arm` is called again, and a
//!   tick already in flight does not re-arm on completion.

use std::time::{Duration, Instant};

/// Smallest interval the schedule accepts.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Proof that a tick was handed out; pass it back to `complete`.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an auto-save tick must be completed to re-arm the schedule"]
pub struct AutoSaveTick {
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AutoSaveSchedule {
    interval: Duration,
    next_due: Option<Instant>,
    in_flight: bool,
    generation: u64,
}

impl AutoSaveSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the schedule so the first tick is due `interval` after `now`.
    ///
    /// Re-arming replaces any pending tick.
    pub fn arm(&mut self, now: Instant, interval: Duration) {
        self.interval = interval.max(MIN_INTERVAL);
        self.generation += 1;
        self.next_due = Some(now + self.interval);
    }

    /// Cancels any pending tick. Idempotent; returns whether anything was armed.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.next_due.is_some() || self.in_flight;
        self.generation += 1;
        self.next_due = None;
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Hands out a tick when one is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<AutoSaveTick> {
        if self.in_flight {
            return None;
        }
        match self.next_due {
            Some(due) if due <= now => {
                self.next_due = None;
                self.in_flight = true;
                Some(AutoSaveTick {
                    generation: self.generation,
                })
            }
            _ => None,
        }
    }

    /// Marks `tick` finished and arms the next one relative to `finished_at`.
    pub fn complete(&mut self, tick: AutoSaveTick, finished_at: Instant) {
        self.in_flight = false;
        if tick.generation == self.generation && self.next_due.is_none() {
            self.next_due = Some(finished_at + self.interval);
        }
    }
}
