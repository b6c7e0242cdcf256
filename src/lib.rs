// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Strontium Lock: expiration-based lock coordination for transactions
//! running over an eventually-consistent key-column store.
//!
//! This crate provides local lock mediation between requesters of one
//! process, the three-phase write/check/delete protocol that puts durable
//! claims in the store, and an injected clock for every expiration decision.

pub mod locking;
pub mod time;

pub use locking::{
    BackendError, ConfigError, FailureKind, KeyColumn, LocalLockMediator, LockBackend,
    LockMediators, LockStatus, Locker, LockerConfig, LockingError,
};
pub use time::{Clock, ManualClock, SystemClock, TimeUnit, Timestamp};
