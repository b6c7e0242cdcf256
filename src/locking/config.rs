// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Configuration for lockers and lock backends.

use std::time::Duration;

use crate::time::TimeUnit;

use super::error::ConfigError;

/// Default time after which an unreleased lock is considered expired.
pub const DEFAULT_LOCK_EXPIRE: Duration = Duration::from_secs(300);

/// Default time a backend waits for a lock write to be acknowledged.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(100);

/// Default number of backend attempts per lock operation.
pub const DEFAULT_LOCK_RETRY_COUNT: usize = 3;

/// Configuration for [`Locker`](super::Locker) and the lock backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockerConfig {
    /// Identifies this process to other processes sharing the lock store.
    pub unique_instance_id: String,
    /// Namespace selecting the local lock mediator. Lockers in one process
    /// that talk to the same store must share it.
    pub local_mediator_group: Option<String>,
    /// Time after which an unreleased lock is considered expired.
    pub lock_expire: Duration,
    /// Time a backend waits for a lock write to be acknowledged, and waits
    /// after writing before checking it.
    pub lock_wait: Duration,
    /// Number of backend attempts per lock operation.
    pub lock_retry_count: usize,
    /// Whether backends delete expired lock claims they come across.
    pub clean_expired: bool,
    /// Resolution of the default clock.
    pub time_unit: TimeUnit,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            unique_instance_id: format!("strontium-{}", std::process::id()),
            local_mediator_group: None,
            lock_expire: DEFAULT_LOCK_EXPIRE,
            lock_wait: DEFAULT_LOCK_WAIT,
            lock_retry_count: DEFAULT_LOCK_RETRY_COUNT,
            clean_expired: false,
            time_unit: TimeUnit::Nanos,
        }
    }
}

impl LockerConfig {
    /// Creates a configuration for the given mediator group.
    pub fn new(local_mediator_group: impl Into<String>) -> Self {
        Self::default().with_mediator_group(local_mediator_group)
    }

    /// Sets the process identifier.
    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.unique_instance_id = id.into();
        self
    }

    /// Sets the local mediator group.
    pub fn with_mediator_group(mut self, group: impl Into<String>) -> Self {
        self.local_mediator_group = Some(group.into());
        self
    }

    /// Sets the lock expiry.
    pub fn with_lock_expire(mut self, expire: Duration) -> Self {
        self.lock_expire = expire;
        self
    }

    /// Sets the lock wait.
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    /// Sets the number of backend attempts per lock operation.
    pub fn with_retry_count(mut self, count: usize) -> Self {
        self.lock_retry_count = count;
        self
    }

    /// Enables or disables cleanup of expired claims.
    pub fn with_clean_expired(mut self, clean: bool) -> Self {
        self.clean_expired = clean;
        self
    }

    /// Sets the resolution of the default clock.
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }

    /// Returns the mediator group, if set and non-empty.
    pub fn mediator_group(&self) -> Option<&str> {
        self.local_mediator_group
            .as_deref()
            .filter(|group| !group.is_empty())
    }

    /// Checks the configuration for values no locker can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mediator_group().is_none() {
            return Err(ConfigError::MissingMediatorGroup);
        }
        if self.unique_instance_id.is_empty() {
            return Err(ConfigError::EmptyInstanceId);
        }
        if self.lock_expire.is_zero() {
            return Err(ConfigError::ZeroLockExpire);
        }
        if self.lock_retry_count == 0 {
            return Err(ConfigError::ZeroRetryCount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LockerConfig::default();
        assert_eq!(config.lock_expire, Duration::from_secs(300));
        assert_eq!(config.lock_wait, Duration::from_millis(100));
        assert_eq!(config.lock_retry_count, 3);
        assert!(!config.clean_expired);
        assert!(config.unique_instance_id.starts_with("strontium-"));
        assert_eq!(config.validate(), Err(ConfigError::MissingMediatorGroup));
    }

    #[test]
    fn test_builder_methods() {
        let config = LockerConfig::new("edgestore")
            .with_instance_id("node-1")
            .with_lock_expire(Duration::from_secs(10))
            .with_lock_wait(Duration::from_millis(5))
            .with_retry_count(5)
            .with_clean_expired(true)
            .with_time_unit(TimeUnit::Millis);

        assert_eq!(config.mediator_group(), Some("edgestore"));
        assert_eq!(config.unique_instance_id, "node-1");
        assert_eq!(config.lock_retry_count, 5);
        assert!(config.clean_expired);
        assert_eq!(config.time_unit, TimeUnit::Millis);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = LockerConfig::new("ns");
        assert_eq!(
            base.clone().with_mediator_group("").validate(),
            Err(ConfigError::MissingMediatorGroup)
        );
        assert_eq!(
            base.clone().with_instance_id("").validate(),
            Err(ConfigError::EmptyInstanceId)
        );
        assert_eq!(
            base.clone().with_lock_expire(Duration::ZERO).validate(),
            Err(ConfigError::ZeroLockExpire)
        );
        assert_eq!(
            base.with_retry_count(0).validate(),
            Err(ConfigError::ZeroRetryCount)
        );
    }
}
