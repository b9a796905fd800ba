//! Time source used by reconciliation timestamps and depletion scoring.

use chrono::{Local, Timelike};
use std::cell::Cell;

/// Injectable wall clock.
pub trait Clock {
    /// Unix epoch milliseconds.
    fn now_ms(&self) -> i64;
    /// Local hour of day in `0..24`.
    fn local_hour(&self) -> u32;
}

/// Wall clock backed by the host's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Local::now().timestamp_millis()
    }

    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Manually driven clock for tests and what-if scoring.
#[derive(Debug, Default)]
pub struct FixedClock {
    now_ms: Cell<i64>,
    hour: Cell<u32>,
}

impl FixedClock {
    pub fn new(now_ms: i64, hour: u32) -> Self {
        Self {
            now_ms: Cell::new(now_ms),
            hour: Cell::new(hour % 24),
        }
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.set(hour % 24);
    }

    /// Moves time forward without touching the hour.
    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.set(self.now_ms.get() + delta);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }

    fn local_hour(&self) -> u32 {
        self.hour.get()
    }
}
