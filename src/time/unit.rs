// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Clock resolution units.

use std::time::Duration;

/// The resolution a [`Clock`](super::Clock) reports time in.
///
/// All processes sharing a lock store should agree on the unit: backends
/// that stamp lock columns with the clock reading compare those stamps
/// across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeUnit {
    /// Nanosecond resolution.
    #[default]
    Nanos,
    /// Microsecond resolution.
    Micros,
    /// Millisecond resolution.
    Millis,
}

impl TimeUnit {
    /// Returns the length of one tick of this unit in nanoseconds.
    #[inline]
    pub fn nanos_per_tick(&self) -> u64 {
        match self {
            TimeUnit::Nanos => 1,
            TimeUnit::Micros => 1_000,
            TimeUnit::Millis => 1_000_000,
        }
    }

    /// Returns the length of one tick of this unit.
    #[inline]
    pub fn tick(&self) -> Duration {
        Duration::from_nanos(self.nanos_per_tick())
    }

    /// Returns a short human-readable name for this unit.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Nanos => "ns",
            TimeUnit::Micros => "us",
            TimeUnit::Millis => "ms",
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
