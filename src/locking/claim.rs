// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Claim records and the sharded map that stores them.
//!
//! [`ClaimMap`] exposes only conditioned writes (`put_if_absent`,
//! `replace_if`, `remove_if`). Each one evaluates its condition and applies
//! its mutation while holding the shard's write lock, so the shard lock
//! acquisition is the linearization point of every mediator operation.

use std::backtrace::Backtrace;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::time::Timestamp;

use super::{KeyColumn, Requester};

const NUM_SHARDS: usize = 64;

/// The local requester holding a lock and when that hold lapses.
///
/// Equality and hashing depend only on `holder`. A renewal is therefore a
/// replacement of an *equal* record, and an unlock can be matched against
/// a live record without knowing its expiration.
#[derive(Clone)]
pub struct ClaimRecord<R> {
    holder: R,
    expires_at: Timestamp,
    trace: Option<Arc<Backtrace>>,
}

impl<R: Requester> ClaimRecord<R> {
    /// Creates a record, capturing a backtrace when TRACE logging is enabled.
    pub fn new(holder: R, expires_at: Timestamp) -> Self {
        let trace = if tracing::enabled!(tracing::Level::TRACE) {
            Some(Arc::new(Backtrace::force_capture()))
        } else {
            None
        };
        Self {
            holder,
            expires_at,
            trace,
        }
    }

    /// Returns the requester holding the claim.
    #[inline]
    pub fn holder(&self) -> &R {
        &self.holder
    }

    /// Returns the instant at which the claim lapses.
    #[inline]
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Returns where the claim was acquired, if it was captured.
    #[inline]
    pub fn trace(&self) -> Option<&Backtrace> {
        self.trace.as_deref()
    }

    /// Returns true if the claim lapsed strictly before `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_before(&now)
    }

    /// Returns true if `requester` holds this claim.
    #[inline]
    pub fn is_held_by(&self, requester: &R) -> bool {
        &self.holder == requester
    }
}

impl<R: PartialEq> PartialEq for ClaimRecord<R> {
    fn eq(&self, other: &Self) -> bool {
        self.holder == other.holder
    }
}

impl<R: Eq> Eq for ClaimRecord<R> {}

impl<R: Hash> Hash for ClaimRecord<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.holder.hash(state);
    }
}

impl<R: fmt::Debug> fmt::Debug for ClaimRecord<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimRecord")
            .field("holder", &self.holder)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A shard of the claim map.
struct ClaimShard<R> {
    claims: HashMap<KeyColumn, ClaimRecord<R>>,
}

/// Concurrent `KeyColumn -> ClaimRecord` map with compare-and-swap writes.
///
/// Uses sharding to reduce contention. Each shard is protected by a RwLock.
pub struct ClaimMap<R> {
    shards: [RwLock<ClaimShard<R>>; NUM_SHARDS],
}

impl<R: Requester> ClaimMap<R> {
    /// Creates an empty claim map.
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| {
                RwLock::new(ClaimShard {
                    claims: HashMap::new(),
                })
            }),
        }
    }

    #[inline]
    fn shard(&self, id: &KeyColumn) -> &RwLock<ClaimShard<R>> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % NUM_SHARDS]
    }

    /// Returns a copy of the record for `id`.
    pub fn get(&self, id: &KeyColumn) -> Option<ClaimRecord<R>> {
        self.shard(id).read().claims.get(id).cloned()
    }

    /// Inserts `record` if `id` has none.
    ///
    /// Returns `None` on insert, or the record already present (in which
    /// case nothing changes).
    pub fn put_if_absent(&self, id: &KeyColumn, record: ClaimRecord<R>) -> Option<ClaimRecord<R>> {
        let mut shard = self.shard(id).write();
        match shard.claims.entry(id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                None
            }
            Entry::Occupied(slot) => Some(slot.get().clone()),
        }
    }

    /// Replaces the record for `id` with `record` if a record is present and
    /// `condition` accepts it.
    pub fn replace_if<F>(&self, id: &KeyColumn, record: ClaimRecord<R>, condition: F) -> bool
    where
        F: FnOnce(&ClaimRecord<R>) -> bool,
    {
        let mut shard = self.shard(id).write();
        match shard.claims.get_mut(id) {
            Some(current) if condition(current) => {
                *current = record;
                true
            }
            _ => false,
        }
    }

    /// Removes the record for `id` if one is present and `condition`
    /// accepts it.
    pub fn remove_if<F>(&self, id: &KeyColumn, condition: F) -> bool
    where
        F: FnOnce(&ClaimRecord<R>) -> bool,
    {
        let mut shard = self.shard(id).write();
        let matched = shard.claims.get(id).is_some_and(condition);
        if matched {
            shard.claims.remove(id);
        }
        matched
    }

    /// Returns the number of records, expired ones included.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().claims.len()).sum()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().claims.is_empty())
    }
}

impl<R: Requester> Default for ClaimMap<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> KeyColumn {
        KeyColumn::new("row", "col")
    }

    fn record(holder: u64, expires: u64) -> ClaimRecord<u64> {
        ClaimRecord::new(holder, Timestamp::from_millis(expires))
    }

    #[test]
    fn test_record_equality_ignores_expiration() {
        assert_eq!(record(1, 100), record(1, 900));
        assert_ne!(record(1, 100), record(2, 100));

        let mut h1 = DefaultHasher::new();
        let mut h2 = DefaultHasher::new();
        record(7, 1).hash(&mut h1);
        record(7, 2).hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn test_record_expiry_is_strict() {
        let r = record(1, 100);
        assert!(!r.is_expired_at(Timestamp::from_millis(99)));
        assert!(!r.is_expired_at(Timestamp::from_millis(100)));
        assert!(r.is_expired_at(Timestamp::from_millis(101)));
    }

    #[test]
    fn test_put_if_absent() {
        let map = ClaimMap::new();
        assert!(map.put_if_absent(&id(), record(1, 100)).is_none());

        let existing = map.put_if_absent(&id(), record(2, 200)).unwrap();
        assert_eq!(*existing.holder(), 1);
        assert_eq!(*map.get(&id()).unwrap().holder(), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_replace_if_requires_present_record() {
        let map = ClaimMap::new();
        assert!(!map.replace_if(&id(), record(1, 100), |_| true));
        assert!(map.is_empty());
    }

    #[test]
    fn test_replace_if_honours_condition() {
        let map = ClaimMap::new();
        map.put_if_absent(&id(), record(1, 100));

        let expected = record(2, 0);
        assert!(!map.replace_if(&id(), record(2, 300), |cur| cur == &expected));
        assert_eq!(*map.get(&id()).unwrap().holder(), 1);

        let expected = record(1, 0);
        assert!(map.replace_if(&id(), record(1, 300), |cur| cur == &expected));
        assert_eq!(map.get(&id()).unwrap().expires_at(), Timestamp::from_millis(300));
    }

    #[test]
    fn test_remove_if() {
        let map = ClaimMap::new();
        map.put_if_absent(&id(), record(1, 100));

        assert!(!map.remove_if(&id(), |cur| cur.is_held_by(&2)));
        assert!(map.get(&id()).is_some());

        assert!(map.remove_if(&id(), |cur| cur.is_held_by(&1)));
        assert!(map.get(&id()).is_none());
        assert!(!map.remove_if(&id(), |_| true));
    }

    #[test]
    fn test_distinct_ids_are_independent() {
        let map = ClaimMap::new();
        for i in 0..500u64 {
            let kc = KeyColumn::new(format!("row{i}").as_str(), "col");
            assert!(map.put_if_absent(&kc, record(i, 100)).is_none());
        }
        assert_eq!(map.len(), 500);
    }
}
