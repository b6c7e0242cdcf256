// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! In-process lock mediation.
//!
//! Requesters in one process share a single identity towards the backend
//! store, so the store cannot tell them apart. The mediator resolves their
//! contention first, without any I/O:
//! - A claim on a free lock succeeds
//! - A claim by the current holder renews the expiration
//! - A claim on a lock whose holder lapsed takes it over
//! - Any other claim fails immediately; nothing ever waits

use std::fmt;
use std::sync::Arc;

use tracing::{error, trace, warn};

use crate::time::{Clock, Timestamp};

use super::claim::{ClaimMap, ClaimRecord};
use super::{KeyColumn, Requester};

/// Resolves lock contention between requesters of one process.
///
/// One mediator exists per namespace; see
/// [`LockMediators`](super::LockMediators).
pub struct LocalLockMediator<R> {
    name: String,
    clock: Arc<dyn Clock>,
    locks: ClaimMap<R>,
}

impl<R: Requester> LocalLockMediator<R> {
    /// Creates a mediator for `name` reading time from `clock`.
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            clock,
            locks: ClaimMap::new(),
        }
    }

    /// Returns the namespace this mediator is responsible for.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the clock used for expiration checks.
    #[inline]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Claims `id` for `requester` until `expires_at`.
    ///
    /// Repeated successful claims by the same requester only move the
    /// expiration; one [`release`](Self::release) undoes any number of them.
    /// If a renewal loses a race with a concurrent takeover or release it
    /// returns false, and the caller must assume it no longer holds `id`.
    ///
    /// An `expires_at` already in the past is accepted.
    pub fn claim(&self, id: &KeyColumn, requester: &R, expires_at: Timestamp) -> bool {
        let record = ClaimRecord::new(requester.clone(), expires_at);

        let Some(current) = self.locks.put_if_absent(id, record.clone()) else {
            trace!(lock = %id, namespace = %self.name, txn = ?requester, "new local lock created");
            return true;
        };

        if current.is_held_by(requester) {
            let renewed = self
                .locks
                .replace_if(id, record, |live| live.is_held_by(requester));
            if renewed {
                trace!(
                    lock = %id,
                    namespace = %self.name,
                    txn = ?requester,
                    old_expiration = %current.expires_at(),
                    new_expiration = %expires_at,
                    "updated local lock expiration"
                );
            } else {
                trace!(
                    lock = %id,
                    namespace = %self.name,
                    txn = ?requester,
                    old_expiration = %current.expires_at(),
                    new_expiration = %expires_at,
                    "failed to update local lock expiration"
                );
            }
            return renewed;
        }

        let now = self.clock.now();
        if current.is_expired_at(now) {
            let taken = self.locks.replace_if(id, record, |live| {
                live.is_held_by(current.holder()) && live.is_expired_at(now)
            });
            trace!(
                lock = %id,
                namespace = %self.name,
                txn = ?current.holder(),
                expired = %current.expires_at(),
                taken,
                "discarding expired lock"
            );
            return taken;
        }

        trace!(
            lock = %id,
            namespace = %self.name,
            txn = ?requester,
            owner = ?current.holder(),
            "local lock failed: already owned"
        );
        if let Some(acquired_at) = current.trace() {
            trace!(lock = %id, "owner acquired lock at:\n{acquired_at}");
        }
        false
    }

    /// Releases `id` if `requester` holds it.
    ///
    /// Returns false, leaving any record untouched, when `id` is unclaimed or
    /// claimed by someone else. Once ownership is confirmed this returns
    /// true even if the record vanished before it could be removed.
    pub fn release(&self, id: &KeyColumn, requester: &R) -> bool {
        let Some(observed) = self.locks.get(id) else {
            error!(lock = %id, namespace = %self.name, "local unlock failed: no locks found");
            return false;
        };

        if !observed.is_held_by(requester) {
            error!(
                lock = %id,
                namespace = %self.name,
                txn = ?requester,
                holder = ?observed.holder(),
                "local unlock failed: lock is held by another requester"
            );
            return false;
        }

        self.remove_observed(id, &observed)
    }

    /// Removes the record for `id` if it is still held by `observed`'s holder.
    fn remove_observed(&self, id: &KeyColumn, observed: &ClaimRecord<R>) -> bool {
        let removed = self.locks.remove_if(id, |live| live == observed);
        if removed {
            trace!(lock = %id, namespace = %self.name, txn = ?observed.holder(), "local unlock succeeded");
        } else {
            warn!(
                lock = %id,
                namespace = %self.name,
                txn = ?observed.holder(),
                "lock record disappeared during removal; it either expired \
                 while being removed or was unlocked more than once"
            );
        }
        true
    }

    /// Returns the current holder of `id`, even if its claim has lapsed.
    pub fn holder(&self, id: &KeyColumn) -> Option<R> {
        self.locks.get(id).map(|r| r.holder().clone())
    }

    /// Returns the recorded expiration of the claim on `id`.
    pub fn expires_at(&self, id: &KeyColumn) -> Option<Timestamp> {
        self.locks.get(id).map(|r| r.expires_at())
    }

    /// Returns true if `requester` holds a claim on `id` that has not lapsed.
    pub fn is_claimed_by(&self, id: &KeyColumn, requester: &R) -> bool {
        self.locks
            .get(id)
            .is_some_and(|r| r.is_held_by(requester) && !r.is_expired_at(self.clock.now()))
    }

    /// Returns the number of records, lapsed ones included.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<R: Requester> fmt::Display for LocalLockMediator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LocalLockMediator [{}, ~{} current locks]",
            self.name,
            self.locks.len()
        )
    }
}

impl<R: Requester> fmt::Debug for LocalLockMediator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalLockMediator")
            .field("name", &self.name)
            .field("locks", &self.locks.len())
            .finish()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::time::ManualClock;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    enum Op {
        Claim { lock: u8, txn: u8, ttl_ms: u64 },
        Release { lock: u8, txn: u8 },
        Advance { ms: u64 },
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4, 0u8..4, 0u64..500).prop_map(|(lock, txn, ttl_ms)| Op::Claim { lock, txn, ttl_ms }),
            (0u8..4, 0u8..4).prop_map(|(lock, txn)| Op::Release { lock, txn }),
            (0u64..300).prop_map(|ms| Op::Advance { ms }),
        ]
    }

    fn lock_id(lock: u8) -> KeyColumn {
        KeyColumn::new(vec![lock], "c")
    }

    proptest! {
        #[test]
        fn mediator_matches_sequential_model(ops in prop::collection::vec(arb_op(), 1..100)) {
            let clock = Arc::new(ManualClock::new(Timestamp::from_millis(10_000)));
            let m = LocalLockMediator::<u8>::new("model", clock.clone() as Arc<dyn Clock>);
            let mut model: HashMap<u8, (u8, Timestamp)> = HashMap::new();

            for op in ops {
                match op {
                    Op::Claim { lock, txn, ttl_ms } => {
                        let expires = clock.now().saturating_add(Duration::from_millis(ttl_ms));
                        let expected = match model.get(&lock) {
                            None => true,
                            Some((holder, _)) if *holder == txn => true,
                            Some((_, exp)) => exp.is_before(&clock.now()),
                        };
                        let got = m.claim(&lock_id(lock), &txn, expires);
                        prop_assert_eq!(got, expected);
                        if got {
                            model.insert(lock, (txn, expires));
                        }
                    }
                    Op::Release { lock, txn } => {
                        let expected = matches!(model.get(&lock), Some((holder, _)) if *holder == txn);
                        prop_assert_eq!(m.release(&lock_id(lock), &txn), expected);
                        if expected {
                            model.remove(&lock);
                        }
                    }
                    Op::Advance { ms } => {
                        clock.advance(Duration::from_millis(ms));
                    }
                }

                // At most one live holder per lock, and it matches the model.
                for lock in 0u8..4 {
                    let live: Vec<u8> = (0u8..4)
                        .filter(|txn| m.is_claimed_by(&lock_id(lock), txn))
                        .collect();
                    prop_assert!(live.len() <= 1);
                    let model_holder = model.get(&lock).map(|(h, _)| *h);
                    prop_assert_eq!(m.holder(&lock_id(lock)), model_holder);
                }
            }
        }
    }
}
