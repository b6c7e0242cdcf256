// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Lock identifiers.

use std::fmt;

/// A row key or column name in the backend store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Key(pub Vec<u8>);

impl Key {
    /// Creates a new key from bytes.
    #[inline]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the key.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the key is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(\"{}\")", self.0.escape_ascii())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

/// Identifies one lock: a `(key, column)` pair in the backend store.
///
/// Two claims collide exactly when their `KeyColumn`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyColumn {
    key: Key,
    column: Key,
}

impl KeyColumn {
    /// Creates a lock identifier for `column` within row `key`.
    pub fn new(key: impl Into<Key>, column: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            column: column.into(),
        }
    }

    /// Returns the row key.
    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Returns the column.
    #[inline]
    pub fn column(&self) -> &Key {
        &self.column
    }
}

impl fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyColumn[k={}, c={}]", self.key, self.column)
    }
}
