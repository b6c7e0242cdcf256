// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Hand-driven clock for tests and simulations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{Clock, TimeUnit, Timestamp};

/// A [`Clock`] that only moves when told to.
///
/// `sleep_past` does not block: it advances the clock one tick beyond the
/// requested instant, which is what a sleeping caller would observe on
/// waking.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicU64,
    unit: TimeUnit,
}

impl ManualClock {
    /// Creates a nanosecond-resolution clock reading `start`.
    pub fn new(start: Timestamp) -> Self {
        Self::with_unit(start, TimeUnit::Nanos)
    }

    /// Creates a clock reading `start`, reported in `unit`.
    pub fn with_unit(start: Timestamp, unit: TimeUnit) -> Self {
        Self {
            nanos: AtomicU64::new(start.as_nanos()),
            unit,
        }
    }

    /// Moves the clock forward by `d`.
    pub fn advance(&self, d: Duration) -> Timestamp {
        let delta = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        let previous = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(delta))
            })
            .unwrap_or_else(|n| n);
        Timestamp::from_nanos(previous.saturating_add(delta)).truncate(self.unit)
    }

    /// Sets the clock to `ts` unless that would move it backwards.
    pub fn set(&self, ts: Timestamp) {
        self.nanos.fetch_max(ts.as_nanos(), Ordering::AcqRel);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Timestamp::EPOCH)
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.nanos.load(Ordering::Acquire)).truncate(self.unit)
    }

    #[inline]
    fn unit(&self) -> TimeUnit {
        self.unit
    }

    fn sleep_past(&self, ts: Timestamp) -> Timestamp {
        let wake = ts.truncate(self.unit).saturating_add(self.unit.tick());
        self.set(wake);
        self.now()
    }
}
