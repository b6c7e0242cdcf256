// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Injected time sources for lock expiration.
//!
//! Every expiration decision in the locking layer reads time through the
//! [`Clock`] trait. Two implementations are provided:
//!
//! - [`SystemClock`]: wall-clock time truncated to a [`TimeUnit`], never
//!   reported backwards
//! - [`ManualClock`]: time that moves only when the caller advances it
//!
//! Processes that share a lock store are assumed to be loosely synchronized.
//! Skew between them can make a claim look expired slightly early or late;
//! it cannot make two live claims look valid to the same checker.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use strontium_lock::time::{Clock, ManualClock, Timestamp};
//!
//! let clock = ManualClock::new(Timestamp::from_millis(1_000));
//! let expires = clock.now().saturating_add(Duration::from_secs(10));
//! clock.advance(Duration::from_secs(11));
//! assert!(expires.is_before(&clock.now()));
//! ```

mod manual;
mod system;
mod timestamp;
mod traits;
mod unit;

pub use manual::ManualClock;
pub use system::SystemClock;
pub use timestamp::Timestamp;
pub use traits::Clock;
pub use unit::TimeUnit;

use std::sync::Arc;

/// Creates the default shared clock for `unit`.
pub fn system_clock(unit: TimeUnit) -> Arc<dyn Clock> {
    Arc::new(SystemClock::new(unit))
}
