// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Consistent-key lock backend over an in-memory claim store.
//!
//! Each lock is a row of claim columns ordered by `(timestamp, rid)`, where
//! `rid` identifies the writing process. A process holds a lock when its
//! claim is the oldest one that has not expired. Only the store is shared
//! between processes; there is no coordinator.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::time::{Clock, Timestamp};

use super::backend::{LockBackend, LockStatus};
use super::config::{LockerConfig, DEFAULT_LOCK_EXPIRE, DEFAULT_LOCK_RETRY_COUNT, DEFAULT_LOCK_WAIT};
use super::error::{BackendError, ConfigError};
use super::{KeyColumn, Requester};

type Claim = (Timestamp, String);

/// Shared claim store standing in for an eventually-consistent database.
///
/// Mutations are atomic per call. Failures and latency can be injected to
/// exercise the backend's retry paths.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    rows: Mutex<HashMap<KeyColumn, BTreeSet<Claim>>>,
    failures: Mutex<VecDeque<BackendError>>,
    stalls: Mutex<VecDeque<Duration>>,
}

impl MemoryLockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes each of the next `count` operations fail with `err`.
    pub fn fail_next(&self, count: usize, err: BackendError) {
        let mut failures = self.failures.lock();
        failures.extend(std::iter::repeat(err).take(count));
    }

    /// Makes each of the next `count` mutations take `delay` on the caller's
    /// clock before completing.
    pub fn stall_next(&self, count: usize, delay: Duration) {
        let mut stalls = self.stalls.lock();
        stalls.extend(std::iter::repeat(delay).take(count));
    }

    /// Returns the claims recorded on `id`, oldest first.
    pub fn claims(&self, id: &KeyColumn) -> Vec<(Timestamp, String)> {
        self.rows
            .lock()
            .get(id)
            .map(|row| row.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of locks with at least one claim.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Returns true if no claims are recorded.
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    fn injected_failure(&self) -> Result<(), BackendError> {
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn mutate(
        &self,
        clock: &dyn Clock,
        id: &KeyColumn,
        addition: Option<Claim>,
        deletion: Option<Claim>,
    ) -> Result<(), BackendError> {
        self.injected_failure()?;

        let stall = self.stalls.lock().pop_front();
        if let Some(delay) = stall {
            clock.sleep_past(clock.now().saturating_add(delay));
        }

        let mut rows = self.rows.lock();
        let row = rows.entry(id.clone()).or_default();
        if let Some(claim) = deletion {
            row.remove(&claim);
        }
        if let Some(claim) = addition {
            row.insert(claim);
        }
        if row.is_empty() {
            rows.remove(id);
        }
        Ok(())
    }

    fn slice(&self, id: &KeyColumn) -> Result<Vec<Claim>, BackendError> {
        self.injected_failure()?;
        Ok(self.claims(id))
    }

    fn delete_before(&self, id: &KeyColumn, cutoff: Timestamp) -> Result<usize, BackendError> {
        self.injected_failure()?;

        let mut rows = self.rows.lock();
        let Some(row) = rows.get_mut(id) else {
            return Ok(0);
        };
        let before = row.len();
        row.retain(|(ts, _)| !ts.is_before(&cutoff));
        let removed = before - row.len();
        if row.is_empty() {
            rows.remove(id);
        }
        Ok(removed)
    }
}

/// Status of a claim written by [`MemoryLockBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistentKeyLockStatus {
    write_timestamp: Timestamp,
    expires_at: Timestamp,
}

impl ConsistentKeyLockStatus {
    /// Creates a status for a claim written at `write_timestamp`.
    pub fn new(write_timestamp: Timestamp, expires_at: Timestamp) -> Self {
        Self {
            write_timestamp,
            expires_at,
        }
    }

    /// Returns the timestamp the claim column was written with.
    #[inline]
    pub fn write_timestamp(&self) -> Timestamp {
        self.write_timestamp
    }
}

impl LockStatus for ConsistentKeyLockStatus {
    #[inline]
    fn expires_at(&self) -> Timestamp {
        self.expires_at
    }
}

/// Consistent-key locking on top of a [`MemoryLockStore`].
///
/// One backend represents one process; its `rid` tags every claim it
/// writes. Requesters of the same process are told apart by the local
/// mediator, never by the store.
pub struct MemoryLockBackend {
    store: Arc<MemoryLockStore>,
    rid: String,
    clock: Arc<dyn Clock>,
    lock_expire: Duration,
    lock_wait: Duration,
    retry_count: usize,
    clean_expired: bool,
}

impl MemoryLockBackend {
    /// Creates a backend writing claims tagged `rid`, with default timings.
    pub fn new(store: Arc<MemoryLockStore>, rid: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            rid: rid.into(),
            clock,
            lock_expire: DEFAULT_LOCK_EXPIRE,
            lock_wait: DEFAULT_LOCK_WAIT,
            retry_count: DEFAULT_LOCK_RETRY_COUNT,
            clean_expired: false,
        }
    }

    /// Creates a backend from `config`, using its instance id as `rid`.
    pub fn from_config(
        store: Arc<MemoryLockStore>,
        config: &LockerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(store, config.unique_instance_id.clone(), clock)
            .with_lock_expire(config.lock_expire)
            .with_lock_wait(config.lock_wait)
            .with_retry_count(config.lock_retry_count)
            .with_clean_expired(config.clean_expired))
    }

    pub fn with_lock_expire(mut self, expire: Duration) -> Self {
        self.lock_expire = expire;
        self
    }

    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn with_retry_count(mut self, count: usize) -> Self {
        self.retry_count = count.max(1);
        self
    }

    pub fn with_clean_expired(mut self, clean: bool) -> Self {
        self.clean_expired = clean;
        self
    }

    /// Returns the process identifier tagging this backend's claims.
    pub fn rid(&self) -> &str {
        &self.rid
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Arc<MemoryLockStore> {
        &self.store
    }

    fn claim_at(&self, ts: Timestamp) -> Claim {
        (ts, self.rid.clone())
    }

    fn delete_once(&self, id: &KeyColumn, ts: Timestamp) -> Result<(), BackendError> {
        self.store
            .mutate(&*self.clock, id, None, Some(self.claim_at(ts)))
    }

    fn slice_with_retries(&self, id: &KeyColumn) -> Result<Vec<Claim>, BackendError> {
        for _ in 0..self.retry_count {
            match self.store.slice(id) {
                Ok(claims) => return Ok(claims),
                Err(err) if err.is_temporary() => {
                    warn!(lock = %id, error = %err, "temporary storage failure while checking locks");
                }
                Err(err) => {
                    error!(lock = %id, error = %err, "failed to check locks");
                    return Err(err);
                }
            }
        }
        Err(BackendError::temporary(format!(
            "maximum retries ({}) exceeded while checking locks",
            self.retry_count
        )))
    }

    fn clean(&self, id: &KeyColumn, cutoff: Timestamp) {
        match self.store.delete_before(id, cutoff) {
            Ok(removed) => debug!(lock = %id, removed, cutoff = %cutoff, "deleted expired claims"),
            Err(err) => warn!(lock = %id, error = %err, "failed to delete expired claims"),
        }
    }

    fn check_seniority(
        &self,
        id: &KeyColumn,
        status: &ConsistentKeyLockStatus,
        live: &[Claim],
    ) -> Result<(), BackendError> {
        for (ts, rid) in live {
            if *rid != self.rid {
                let msg = format!("lock on {id} already held by {rid} (we are {})", self.rid);
                debug!("{msg}");
                return Err(BackendError::Temporary(msg));
            }
            if *ts == status.write_timestamp {
                debug!(lock = %id, "checked lock");
                return Ok(());
            }
            warn!(
                lock = %id,
                rid = %rid,
                actual = %ts,
                expected = %status.write_timestamp,
                "skipping outdated claim with our rid but mismatched timestamp"
            );
        }

        if live.is_empty() {
            Err(BackendError::temporary(format!("no lock claims found for {id}")))
        } else {
            Err(BackendError::permanent(format!(
                "read {} claims with our rid {} but none with our timestamp {}",
                live.len(),
                self.rid,
                status.write_timestamp
            )))
        }
    }
}

impl<R: Requester> LockBackend<R> for MemoryLockBackend {
    type Status = ConsistentKeyLockStatus;

    fn write_single_lock(&self, id: &KeyColumn, _tx: &R) -> Result<Self::Status, BackendError> {
        let mut previous: Option<Timestamp> = None;

        for _ in 0..self.retry_count {
            let start = self.clock.now();
            let result = self.store.mutate(
                &*self.clock,
                id,
                Some(self.claim_at(start)),
                previous.map(|ts| self.claim_at(ts)),
            );
            let elapsed = self.clock.now().duration_since(start);

            match result {
                Ok(()) if elapsed <= self.lock_wait => {
                    return Ok(ConsistentKeyLockStatus::new(
                        start,
                        start.saturating_add(self.lock_expire),
                    ));
                }
                Ok(()) => {
                    warn!(
                        lock = %id,
                        elapsed = ?elapsed,
                        limit = ?self.lock_wait,
                        "lock write succeeded but took too long"
                    );
                }
                Err(err) if err.is_temporary() => {
                    warn!(lock = %id, error = %err, "temporary exception during lock write");
                }
                Err(err) => {
                    error!(lock = %id, error = %err, "fatal exception during lock write");
                    if let Err(del) = self.delete_once(id, start) {
                        warn!(
                            lock = %id,
                            error = %del,
                            "failed to delete lock write, abandoning potentially unreleased claim"
                        );
                    }
                    return Err(err);
                }
            }
            previous = Some(start);
        }

        if let Some(ts) = previous {
            if let Err(err) = self.delete_once(id, ts) {
                debug!(lock = %id, error = %err, "failed to delete last lock write attempt");
            }
        }
        Err(BackendError::temporary("lock write retry count exceeded"))
    }

    fn check_single_lock(
        &self,
        id: &KeyColumn,
        status: &Self::Status,
        _tx: &R,
    ) -> Result<(), BackendError> {
        let now = self
            .clock
            .sleep_past(status.write_timestamp.saturating_add(self.lock_wait));
        let claims = self.slice_with_retries(id)?;

        let cutoff = now.saturating_sub(self.lock_expire);
        let mut live = Vec::with_capacity(claims.len());
        let mut cleaned = false;
        for (ts, rid) in claims {
            if ts.is_before(&cutoff) {
                warn!(lock = %id, timestamp = %ts, "discarded expired claim");
                if self.clean_expired && !cleaned {
                    self.clean(id, cutoff);
                    cleaned = true;
                }
                if rid == self.rid && ts == status.write_timestamp {
                    return Err(BackendError::ExpiredLock {
                        lock: id.clone(),
                        written_at: ts,
                        cutoff,
                    });
                }
                continue;
            }
            live.push((ts, rid));
        }

        self.check_seniority(id, status, &live)
    }

    fn delete_single_lock(
        &self,
        id: &KeyColumn,
        status: &Self::Status,
        _tx: &R,
    ) -> Result<(), BackendError> {
        for _ in 0..self.retry_count {
            match self.delete_once(id, status.write_timestamp) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_temporary() => {
                    warn!(lock = %id, error = %err, "temporary storage exception while deleting lock");
                }
                Err(err) => return Err(err),
            }
        }
        Err(BackendError::temporary(format!(
            "maximum retries ({}) exceeded while deleting lock",
            self.retry_count
        )))
    }
}

impl std::fmt::Debug for MemoryLockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLockBackend")
            .field("rid", &self.rid)
            .field("lock_expire", &self.lock_expire)
            .field("lock_wait", &self.lock_wait)
            .field("retry_count", &self.retry_count)
            .field("clean_expired", &self.clean_expired)
            .finish()
    }
}
