// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Expiration-based lock mediation for a shared, eventually-consistent store.
//!
//! Many requesters, possibly spread across processes, contend for locks
//! named by a `(key, column)` pair. Locks are never waited on: a contended
//! claim fails immediately and the requester decides whether to retry.
//!
//! # Key Concepts
//!
//! ## Local Mediation
//!
//! Before a requester touches the store, it claims the lock in a
//! [`LocalLockMediator`] shared by every locker in its process that talks to
//! the same store. Two requesters in one process therefore never race each
//! other in the backend. Claims carry an expiration; an expired claim can be
//! taken over by anyone.
//!
//! ## Three Phases
//!
//! A [`Locker`] drives every requester through:
//! - `write_lock`: claim locally, then write a claim to the backend
//! - `check_locks`: verify the backend claims before committing
//! - `delete_locks`: release everything, always, even after failures
//!
//! Failures are either temporary (retrying may help) or permanent. Internal
//! assertion failures pass through unmapped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use strontium_lock::locking::{
//!     KeyColumn, LockMediators, Locker, LockerConfig, MemoryLockBackend, MemoryLockStore,
//! };
//! use strontium_lock::time::{Clock, ManualClock, Timestamp};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000)));
//! let store = Arc::new(MemoryLockStore::new());
//! let config = LockerConfig::new("edgestore").with_lock_wait(Duration::from_millis(5));
//!
//! let backend = MemoryLockBackend::from_config(store, &config, clock.clone())?;
//! let registry = LockMediators::new();
//! let locker = Locker::builder(backend)
//!     .clock(clock.clone())
//!     .from_config(&config, &registry)?
//!     .build()?;
//!
//! let tx = 1u64;
//! let id = KeyColumn::new("vertex-7", "name");
//! locker.write_lock(&id, &tx)?;
//! locker.check_locks(&tx)?;
//! locker.delete_locks(&tx)?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod claim;
mod config;
mod error;
mod key;
mod locker;
mod mediator;
mod memory;
mod registry;
mod state;

pub use backend::{LockBackend, LockStatus};
pub use claim::{ClaimMap, ClaimRecord};
pub use config::{
    LockerConfig, DEFAULT_LOCK_EXPIRE, DEFAULT_LOCK_RETRY_COUNT, DEFAULT_LOCK_WAIT,
};
pub use error::{BackendError, ConfigError, FailureKind, LockingError};
pub use key::{Key, KeyColumn};
pub use locker::{Locker, LockerBuilder};
pub use mediator::LocalLockMediator;
pub use memory::{ConsistentKeyLockStatus, MemoryLockBackend, MemoryLockStore};
pub use registry::LockMediators;
pub use state::LockerState;

use std::fmt::Debug;
use std::hash::Hash;

/// An opaque lock requester, typically a transaction handle.
///
/// Requesters are compared by equality only; no ordering between them
/// is assumed.
pub trait Requester: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T: Eq + Hash + Clone + Debug + Send + Sync + 'static> Requester for T {}
