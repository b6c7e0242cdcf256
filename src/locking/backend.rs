// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Backend lock primitives.

use crate::time::Timestamp;

use super::error::BackendError;
use super::KeyColumn;

/// Backend-specific proof that a lock was written.
///
/// The locker only reads the expiration; everything else belongs to the
/// backend that produced it.
pub trait LockStatus: Clone + Send + Sync + std::fmt::Debug {
    /// Returns the instant at which the backend considers the lock expired.
    fn expires_at(&self) -> Timestamp;
}

/// Durable lock primitives for one storage backend.
///
/// A [`Locker`](super::Locker) drives these in a fixed order per requester:
/// `write_single_lock` once per lock, optionally `check_single_lock` once per
/// written lock, then `delete_single_lock` once per written lock.
pub trait LockBackend<R>: Send + Sync {
    /// The status returned by a successful write.
    type Status: LockStatus;

    /// Durably records `tx`'s claim on `id`.
    ///
    /// Called at most once per `(id, tx)` until that lock is deleted.
    fn write_single_lock(&self, id: &KeyColumn, tx: &R) -> Result<Self::Status, BackendError>;

    /// Verifies that the claim recorded by `write_single_lock` still holds.
    ///
    /// Must be read-only: a lock found not to be held is an error, never
    /// a reason to take it.
    fn check_single_lock(
        &self,
        id: &KeyColumn,
        status: &Self::Status,
        tx: &R,
    ) -> Result<(), BackendError>;

    /// Removes the claim recorded by `write_single_lock`.
    fn delete_single_lock(
        &self,
        id: &KeyColumn,
        status: &Self::Status,
        tx: &R,
    ) -> Result<(), BackendError>;
}

impl<R, B: LockBackend<R> + ?Sized> LockBackend<R> for std::sync::Arc<B> {
    type Status = B::Status;

    #[inline]
    fn write_single_lock(&self, id: &KeyColumn, tx: &R) -> Result<Self::Status, BackendError> {
        (**self).write_single_lock(id, tx)
    }

    #[inline]
    fn check_single_lock(
        &self,
        id: &KeyColumn,
        status: &Self::Status,
        tx: &R,
    ) -> Result<(), BackendError> {
        (**self).check_single_lock(id, status, tx)
    }

    #[inline]
    fn delete_single_lock(
        &self,
        id: &KeyColumn,
        status: &Self::Status,
        tx: &R,
    ) -> Result<(), BackendError> {
        (**self).delete_single_lock(id, status, tx)
    }
}
