// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Per-locker record of locks written to the backend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{KeyColumn, Requester};

type TxLocks<S> = Arc<Mutex<HashMap<KeyColumn, S>>>;

/// Tracks, per requester, which locks a locker has written to the backend
/// and the backend status returned for each.
///
/// Each requester's locks live behind their own mutex, so calls for
/// different requesters only meet briefly on the outer map. Calls for one
/// requester are expected to be made sequentially by that requester.
pub struct LockerState<R, S> {
    locks: RwLock<HashMap<R, TxLocks<S>>>,
}

impl<R: Requester, S: Clone> LockerState<R, S> {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    fn tx_locks(&self, tx: &R) -> TxLocks<S> {
        if let Some(m) = self.locks.read().get(tx) {
            return Arc::clone(m);
        }
        let mut locks = self.locks.write();
        Arc::clone(locks.entry(tx.clone()).or_default())
    }

    fn existing_tx_locks(&self, tx: &R) -> Option<TxLocks<S>> {
        self.locks.read().get(tx).cloned()
    }

    /// Returns true if `tx` has a backend lock recorded on `id`.
    pub fn has(&self, tx: &R, id: &KeyColumn) -> bool {
        self.existing_tx_locks(tx)
            .is_some_and(|m| m.lock().contains_key(id))
    }

    /// Records that `tx` wrote `id` to the backend with `status`.
    pub fn take(&self, tx: &R, id: &KeyColumn, status: S) {
        self.tx_locks(tx).lock().insert(id.clone(), status);
    }

    /// Forgets `tx`'s lock on `id`, returning its status.
    pub fn release(&self, tx: &R, id: &KeyColumn) -> Option<S> {
        self.existing_tx_locks(tx)?.lock().remove(id)
    }

    /// Returns a snapshot of `tx`'s locks, registering `tx` on first use.
    pub fn locks_for(&self, tx: &R) -> Vec<(KeyColumn, S)> {
        self.tx_locks(tx)
            .lock()
            .iter()
            .map(|(id, status)| (id.clone(), status.clone()))
            .collect()
    }

    /// Returns the status recorded for `tx`'s lock on `id`.
    pub fn status(&self, tx: &R, id: &KeyColumn) -> Option<S> {
        self.existing_tx_locks(tx)?.lock().get(id).cloned()
    }

    /// Returns the number of locks recorded for `tx`.
    pub fn count_for(&self, tx: &R) -> usize {
        self.existing_tx_locks(tx).map_or(0, |m| m.lock().len())
    }

    /// Returns the number of requesters ever registered.
    pub fn requesters(&self) -> usize {
        self.locks.read().len()
    }
}

impl<R: Requester, S: Clone> Default for LockerState<R, S> {
    fn default() -> Self {
        Self::new()
    }
}
