// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Wall-clock time source.
//!
//! Reads the system clock, truncates it to a configured unit, and never
//! reports an instant earlier than a previous reading even if the system
//! clock steps backwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{Clock, TimeUnit, Timestamp};

/// Monotonic wall-clock [`Clock`].
pub struct SystemClock {
    last_reading: AtomicU64,
    unit: TimeUnit,
}

impl SystemClock {
    /// Creates a system clock reporting time in `unit`.
    pub fn new(unit: TimeUnit) -> Self {
        Self {
            last_reading: AtomicU64::new(0),
            unit,
        }
    }

    /// Nanosecond-resolution system clock.
    pub fn nanos() -> Self {
        Self::new(TimeUnit::Nanos)
    }

    /// Microsecond-resolution system clock.
    pub fn micros() -> Self {
        Self::new(TimeUnit::Micros)
    }

    /// Millisecond-resolution system clock.
    pub fn millis() -> Self {
        Self::new(TimeUnit::Millis)
    }

    fn physical_time_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::nanos()
    }
}

impl std::fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemClock")
            .field("unit", &self.unit)
            .finish()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let physical = Timestamp::from_nanos(Self::physical_time_nanos())
            .truncate(self.unit)
            .as_nanos();

        loop {
            let last = self.last_reading.load(Ordering::Acquire);
            let reading = physical.max(last);

            match self.last_reading.compare_exchange(
                last,
                reading,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Timestamp::from_nanos(reading),
                Err(_) => continue,
            }
        }
    }

    #[inline]
    fn unit(&self) -> TimeUnit {
        self.unit
    }

    fn sleep_past(&self, ts: Timestamp) -> Timestamp {
        loop {
            let now = self.now();
            if ts.is_before(&now) {
                return now;
            }

            let remaining = ts.duration_since(now) + self.unit.tick();
            std::thread::sleep(remaining.max(Duration::from_micros(100)));
        }
    }
}
