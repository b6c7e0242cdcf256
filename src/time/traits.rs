// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Clock trait definition.

use std::sync::Arc;

use super::{TimeUnit, Timestamp};

/// The sole source of time for the locking layer.
///
/// Mediators, lockers and backends never read the system clock directly;
/// they go through this trait so that tests can substitute a
/// [`ManualClock`](super::ManualClock) and control the flow of time exactly.
pub trait Clock: Send + Sync {
    /// Returns the current instant, truncated to [`Clock::unit`].
    ///
    /// Successive calls never go backwards.
    fn now(&self) -> Timestamp;

    /// Returns the resolution this clock reports time in.
    fn unit(&self) -> TimeUnit;

    /// Blocks until `now()` is strictly after `ts`, then returns that reading.
    ///
    /// Returns immediately if `ts` is already in the past.
    fn sleep_past(&self, ts: Timestamp) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    #[inline]
    fn unit(&self) -> TimeUnit {
        (**self).unit()
    }

    #[inline]
    fn sleep_past(&self, ts: Timestamp) -> Timestamp {
        (**self).sleep_past(ts)
    }
}
