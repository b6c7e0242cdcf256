// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Three-phase lock protocol.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::time::{self, Clock, TimeUnit};

use super::backend::{LockBackend, LockStatus};
use super::config::{LockerConfig, DEFAULT_LOCK_EXPIRE};
use super::error::{ConfigError, LockingError};
use super::{KeyColumn, LocalLockMediator, LockMediators, LockerState, Requester};

/// Claims, verifies and releases locks on behalf of requesters.
///
/// Every requester follows the same sequence:
/// 1. [`write_lock`](Self::write_lock) once per lock it needs
/// 2. [`check_locks`](Self::check_locks) once, only if it intends to commit
/// 3. [`delete_locks`](Self::delete_locks) once, always
///
/// Claims go through the [`LocalLockMediator`] before the backend is
/// touched, so requesters of one process never race each other in the
/// store. A requester's own calls must not overlap.
pub struct Locker<R, B: LockBackend<R>> {
    backend: B,
    clock: Arc<dyn Clock>,
    mediator: Arc<LocalLockMediator<R>>,
    state: Arc<LockerState<R, B::Status>>,
    lock_expire: Duration,
}

impl<R: Requester, B: LockBackend<R>> Locker<R, B> {
    /// Starts building a locker around `backend`.
    pub fn builder(backend: B) -> LockerBuilder<R, B> {
        LockerBuilder::new(backend)
    }

    /// Claims `id` for `tx`, first locally and then in the backend.
    ///
    /// Does nothing if `tx` already wrote `id`. Local contention fails
    /// immediately without a backend call. If the backend write fails, the
    /// local claim is released before the error is returned.
    pub fn write_lock(&self, id: &KeyColumn, tx: &R) -> Result<(), LockingError> {
        if self.state.has(tx, id) {
            debug!(lock = %id, txn = ?tx, "transaction already wrote lock");
            return Ok(());
        }

        let expires_at = self.clock.now().saturating_add(self.lock_expire);
        if !self.mediator.claim(id, tx, expires_at) {
            return Err(LockingError::LocalContention { lock: id.clone() });
        }

        match self.backend.write_single_lock(id, tx) {
            Ok(status) => {
                // Keep the local claim alive exactly as long as the backend's.
                if !self.mediator.claim(id, tx, status.expires_at()) {
                    warn!(
                        lock = %id,
                        txn = ?tx,
                        expiration = %status.expires_at(),
                        "failed to renew local claim after backend write"
                    );
                }
                self.state.take(tx, id, status);
                Ok(())
            }
            Err(err) => {
                debug!(lock = %id, txn = ?tx, error = %err, "backend lock write failed");
                self.mediator.release(id, tx);
                Err(LockingError::from_backend(id, err))
            }
        }
    }

    /// Verifies every lock `tx` wrote.
    ///
    /// Stops at the first lock that fails verification; the transaction
    /// must then be treated as unsafe to commit. Succeeds trivially when
    /// `tx` wrote no locks.
    pub fn check_locks(&self, tx: &R) -> Result<(), LockingError> {
        let locks = self.state.locks_for(tx);
        if locks.is_empty() {
            return Ok(());
        }

        for (id, status) in &locks {
            self.backend
                .check_single_lock(id, status, tx)
                .map_err(|err| {
                    debug!(lock = %id, txn = ?tx, error = %err, "lock check failed");
                    LockingError::from_backend(id, err)
                })?;
        }
        Ok(())
    }

    /// Releases every lock `tx` wrote, in the backend and locally.
    ///
    /// Backend failures are logged and skipped; each lock is released
    /// locally and forgotten regardless. Only an
    /// [`Assertion`](super::BackendError::Assertion) from the backend is
    /// returned, after the lock it concerns has been cleaned up locally.
    pub fn delete_locks(&self, tx: &R) -> Result<(), LockingError> {
        for (id, status) in self.state.locks_for(tx) {
            let outcome = self.backend.delete_single_lock(&id, &status, tx);

            self.mediator.release(&id, tx);
            self.state.release(tx, &id);

            match outcome {
                Ok(()) => {}
                Err(err) if err.is_assertion() => return Err(LockingError::Internal(err)),
                Err(err) => {
                    error!(lock = %id, txn = ?tx, error = %err, "exception while deleting lock");
                }
            }
        }
        Ok(())
    }

    /// Returns the local mediator this locker claims through.
    #[inline]
    pub fn mediator(&self) -> &Arc<LocalLockMediator<R>> {
        &self.mediator
    }

    /// Returns the record of locks written to the backend.
    #[inline]
    pub fn state(&self) -> &Arc<LockerState<R, B::Status>> {
        &self.state
    }

    /// Returns the locker's clock.
    #[inline]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the lifetime of a fresh local claim.
    #[inline]
    pub fn lock_expire(&self) -> Duration {
        self.lock_expire
    }

    /// Returns the backend.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<R: Requester, B: LockBackend<R>> fmt::Debug for Locker<R, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locker")
            .field("mediator", &self.mediator.name())
            .field("lock_expire", &self.lock_expire)
            .finish()
    }
}

/// Builder for [`Locker`].
pub struct LockerBuilder<R, B: LockBackend<R>> {
    backend: B,
    clock: Option<Arc<dyn Clock>>,
    mediator: Option<Arc<LocalLockMediator<R>>>,
    state: Option<Arc<LockerState<R, B::Status>>>,
    lock_expire: Duration,
}

impl<R: Requester, B: LockBackend<R>> LockerBuilder<R, B> {
    fn new(backend: B) -> Self {
        Self {
            backend,
            clock: None,
            mediator: None,
            state: None,
            lock_expire: DEFAULT_LOCK_EXPIRE,
        }
    }

    fn clock_or_default(&mut self) -> Arc<dyn Clock> {
        Arc::clone(
            self.clock
                .get_or_insert_with(|| time::system_clock(TimeUnit::default())),
        )
    }

    /// Sets the clock. Defaults to a nanosecond [`SystemClock`](crate::time::SystemClock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the lifetime of a fresh local claim.
    pub fn lock_expire(mut self, expire: Duration) -> Self {
        self.lock_expire = expire;
        self
    }

    /// Uses `mediator` for local claims.
    pub fn mediator(mut self, mediator: Arc<LocalLockMediator<R>>) -> Self {
        self.mediator = Some(mediator);
        self
    }

    /// Uses the mediator `registry` holds for `name`.
    ///
    /// A mediator created by this call reads the builder's current clock,
    /// so set the clock first.
    pub fn mediator_name(mut self, registry: &LockMediators<R>, name: &str) -> Self {
        let clock = self.clock_or_default();
        self.mediator = Some(registry.get(name, clock));
        self
    }

    /// Replaces the locker's lock record.
    ///
    /// Intended for tests; two lockers sharing a record will release each
    /// other's locks.
    pub fn internal_state(mut self, state: Arc<LockerState<R, B::Status>>) -> Self {
        self.state = Some(state);
        self
    }

    /// Applies `config`: expiry, the default clock's unit, and the mediator
    /// named by its group.
    pub fn from_config(
        mut self,
        config: &LockerConfig,
        registry: &LockMediators<R>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if self.clock.is_none() {
            self.clock = Some(time::system_clock(config.time_unit));
        }
        let group = config
            .mediator_group()
            .ok_or(ConfigError::MissingMediatorGroup)?;
        Ok(self
            .lock_expire(config.lock_expire)
            .mediator_name(registry, group))
    }

    /// Builds the locker.
    pub fn build(mut self) -> Result<Locker<R, B>, ConfigError> {
        if self.lock_expire.is_zero() {
            return Err(ConfigError::ZeroLockExpire);
        }
        let clock = self.clock_or_default();
        let mediator = self.mediator.ok_or(ConfigError::MissingMediator)?;

        Ok(Locker {
            backend: self.backend,
            clock,
            mediator,
            state: self.state.unwrap_or_default(),
            lock_expire: self.lock_expire,
        })
    }
}
