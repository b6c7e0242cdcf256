// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Locking error types.

use super::KeyColumn;

/// Errors reported by a [`LockBackend`](super::LockBackend) primitive.
///
/// The locker only distinguishes temporary failures from everything else,
/// plus the [`BackendError::Assertion`] carve-out, which is never mapped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("temporary backend failure: {0}")]
    Temporary(String),

    #[error("permanent backend failure: {0}")]
    Permanent(String),

    #[error("expired lock on {lock}: written at {written_at}, expired before {cutoff}")]
    ExpiredLock {
        lock: KeyColumn,
        written_at: crate::time::Timestamp,
        cutoff: crate::time::Timestamp,
    },

    #[error("backend assertion failed: {0}")]
    Assertion(String),
}

impl BackendError {
    /// Shorthand for [`BackendError::Temporary`].
    pub fn temporary(msg: impl Into<String>) -> Self {
        BackendError::Temporary(msg.into())
    }

    /// Shorthand for [`BackendError::Permanent`].
    pub fn permanent(msg: impl Into<String>) -> Self {
        BackendError::Permanent(msg.into())
    }

    /// Shorthand for [`BackendError::Assertion`].
    pub fn assertion(msg: impl Into<String>) -> Self {
        BackendError::Assertion(msg.into())
    }

    /// Returns true if retrying later may succeed.
    #[inline]
    pub fn is_temporary(&self) -> bool {
        matches!(self, BackendError::Temporary(_))
    }

    /// Returns true for internal assertion failures.
    #[inline]
    pub fn is_assertion(&self) -> bool {
        matches!(self, BackendError::Assertion(_))
    }
}

/// How a caller should react to a [`LockingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Retrying the whole transaction later is reasonable.
    Temporary,
    /// The transaction cannot proceed without external remediation.
    Permanent,
    /// An internal assertion tripped; propagated as-is.
    Internal,
}

/// Errors returned by the [`Locker`](super::Locker) protocol.
#[derive(Debug, thiserror::Error)]
pub enum LockingError {
    #[error("local lock contention on {lock}")]
    LocalContention { lock: KeyColumn },

    #[error("temporary locking failure on {lock}: {source}")]
    Temporary {
        lock: KeyColumn,
        #[source]
        source: BackendError,
    },

    #[error("permanent locking failure on {lock}: {source}")]
    Permanent {
        lock: KeyColumn,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Internal(BackendError),
}

impl LockingError {
    /// Classifies a backend failure on `lock`.
    ///
    /// Temporary backend failures stay temporary, assertions pass through
    /// untouched, and everything else becomes permanent.
    pub fn from_backend(lock: &KeyColumn, err: BackendError) -> Self {
        match err {
            BackendError::Temporary(_) => LockingError::Temporary {
                lock: lock.clone(),
                source: err,
            },
            BackendError::Assertion(_) => LockingError::Internal(err),
            BackendError::Permanent(_) | BackendError::ExpiredLock { .. } => {
                LockingError::Permanent {
                    lock: lock.clone(),
                    source: err,
                }
            }
        }
    }

    /// Returns the failure classification.
    pub fn kind(&self) -> FailureKind {
        match self {
            LockingError::Temporary { .. } => FailureKind::Temporary,
            LockingError::LocalContention { .. } | LockingError::Permanent { .. } => {
                FailureKind::Permanent
            }
            LockingError::Internal(_) => FailureKind::Internal,
        }
    }

    /// Returns true if retrying the transaction later is reasonable.
    #[inline]
    pub fn is_temporary(&self) -> bool {
        self.kind() == FailureKind::Temporary
    }

    /// Returns true if the transaction must not be retried as-is.
    #[inline]
    pub fn is_permanent(&self) -> bool {
        self.kind() == FailureKind::Permanent
    }

    /// Returns the lock the failure refers to, if any.
    pub fn lock(&self) -> Option<&KeyColumn> {
        match self {
            LockingError::LocalContention { lock }
            | LockingError::Temporary { lock, .. }
            | LockingError::Permanent { lock, .. } => Some(lock),
            LockingError::Internal(_) => None,
        }
    }
}

/// Errors from validating a [`LockerConfig`](super::LockerConfig) or
/// building a [`Locker`](super::Locker).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("local lock mediator group must not be empty")]
    MissingMediatorGroup,

    #[error("no local lock mediator configured")]
    MissingMediator,

    #[error("unique instance id must not be empty")]
    EmptyInstanceId,

    #[error("lock expiry must be positive")]
    ZeroLockExpire,

    #[error("lock retry count must be at least 1")]
    ZeroRetryCount,
}
