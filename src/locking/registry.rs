// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Namespace-to-mediator registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::time::Clock;

use super::{LocalLockMediator, Requester};

/// Hands out exactly one [`LocalLockMediator`] per namespace.
///
/// Lockers that must see each other's local claims (for example, several
/// graph instances in one process talking to the same store) are built
/// with the same namespace against the same registry. The registry is an
/// ordinary value: process bootstrap code creates one and shares it by
/// reference or `Arc`.
pub struct LockMediators<R> {
    mediators: RwLock<HashMap<String, Arc<LocalLockMediator<R>>>>,
}

impl<R: Requester> LockMediators<R> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            mediators: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the mediator for `namespace`, creating it on first use.
    ///
    /// `clock` is only used when the mediator is created; later calls get
    /// the existing mediator with the clock it was created with.
    pub fn get(&self, namespace: &str, clock: Arc<dyn Clock>) -> Arc<LocalLockMediator<R>> {
        if let Some(mediator) = self.mediators.read().get(namespace) {
            return Arc::clone(mediator);
        }

        let mut mediators = self.mediators.write();
        let mediator = mediators.entry(namespace.to_string()).or_insert_with(|| {
            debug!(namespace, "creating local lock mediator");
            Arc::new(LocalLockMediator::new(namespace, clock))
        });
        Arc::clone(mediator)
    }

    /// Returns the mediator for `namespace` if one was created.
    pub fn lookup(&self, namespace: &str) -> Option<Arc<LocalLockMediator<R>>> {
        self.mediators.read().get(namespace).cloned()
    }

    /// Returns the number of namespaces with a mediator.
    pub fn len(&self) -> usize {
        self.mediators.read().len()
    }

    /// Returns true if no mediator was created yet.
    pub fn is_empty(&self) -> bool {
        self.mediators.read().is_empty()
    }

    /// Drops every mediator.
    ///
    /// Lockers already holding a mediator keep it, so claims made through
    /// it become invisible to lockers created afterwards.
    #[cfg(any(test, feature = "test-util"))]
    pub fn clear(&self) {
        self.mediators.write().clear();
    }

    /// Drops the mediator for `namespace`. See [`clear`](Self::clear).
    #[cfg(any(test, feature = "test-util"))]
    pub fn clear_namespace(&self, namespace: &str) {
        self.mediators.write().remove(namespace);
    }
}

impl<R: Requester> Default for LockMediators<R> {
    fn default() -> Self {
        Self::new()
    }
}
