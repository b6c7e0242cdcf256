// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time instants used for lock expiration.

use std::time::Duration;

use super::TimeUnit;

/// An instant expressed in nanoseconds since the Unix epoch.
///
/// Lock claims, backend write times and expirations are all expressed with
/// this type so every comparison in the locking layer uses one unit. Values
/// produced by a [`Clock`](super::Clock) are already truncated to the
/// clock's [`TimeUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Timestamp = Timestamp { nanos: 0 };

    /// The largest representable instant.
    pub const MAX: Timestamp = Timestamp { nanos: u64::MAX };

    /// Creates a timestamp from nanoseconds since the Unix epoch.
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// Returns nanoseconds since the Unix epoch.
    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Returns this instant expressed as a whole number of `unit`s.
    #[inline]
    pub fn as_unit(&self, unit: TimeUnit) -> u64 {
        self.nanos / unit.nanos_per_tick()
    }

    /// Drops any precision finer than `unit`.
    #[inline]
    pub fn truncate(&self, unit: TimeUnit) -> Self {
        let tick = unit.nanos_per_tick();
        Self {
            nanos: self.nanos - self.nanos % tick,
        }
    }

    /// Adds a duration, saturating at [`Timestamp::MAX`].
    #[inline]
    pub fn saturating_add(&self, d: Duration) -> Self {
        let delta = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        Self {
            nanos: self.nanos.saturating_add(delta),
        }
    }

    /// Subtracts a duration, saturating at [`Timestamp::EPOCH`].
    #[inline]
    pub fn saturating_sub(&self, d: Duration) -> Self {
        let delta = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        Self {
            nanos: self.nanos.saturating_sub(delta),
        }
    }

    /// Returns the time elapsed from `earlier` to `self`, or zero if
    /// `earlier` is not actually earlier.
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(earlier.nanos))
    }

    /// Returns true if this instant is strictly before `other`.
    #[inline]
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.nanos < other.nanos
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:09}",
            self.nanos / 1_000_000_000,
            self.nanos % 1_000_000_000
        )
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_unit() -> impl Strategy<Value = TimeUnit> {
        prop_oneof![
            Just(TimeUnit::Nanos),
            Just(TimeUnit::Micros),
            Just(TimeUnit::Millis)
        ]
    }

    proptest! {
        #[test]
        fn truncate_never_moves_forward(nanos in any::<u64>(), unit in arb_unit()) {
            let ts = Timestamp::from_nanos(nanos);
            let truncated = ts.truncate(unit);
            prop_assert!(truncated <= ts);
            prop_assert!(ts.duration_since(truncated) < unit.tick());
        }

        #[test]
        fn truncate_is_idempotent(nanos in any::<u64>(), unit in arb_unit()) {
            let once = Timestamp::from_nanos(nanos).truncate(unit);
            prop_assert_eq!(once, once.truncate(unit));
        }

        #[test]
        fn add_then_sub_restores(base in 0u64..u64::MAX / 2, delta in 0u64..1_000_000_000_000) {
            let ts = Timestamp::from_nanos(base);
            let d = Duration::from_nanos(delta);
            prop_assert_eq!(ts.saturating_add(d).saturating_sub(d), ts);
        }
    }
}
