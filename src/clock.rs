// Time sources for task timestamps

use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;

/// Source of "now" for creation and update timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock that advances by a fixed step on every reading
///
/// Useful in tests that assert on `updatedAt` ordering or id values.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Cell<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Cell::new(start),
            step,
        }
    }

    /// A clock that never advances on its own
    pub fn frozen(at: DateTime<Utc>) -> Self {
        Self::new(at, Duration::zero())
    }

    /// Move the clock forward without taking a reading
    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }

    /// The value the next call to `now()` will return
    pub fn peek(&self) -> DateTime<Utc> {
        self.current.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let now = self.current.get();
        self.current.set(now + self.step);
        now
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
