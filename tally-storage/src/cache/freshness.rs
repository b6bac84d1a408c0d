//! Freshness policy and the read wrapper returned by the context cache.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tally_core::{AssistantConfig, TtlClass};

/// TTL per freshness class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub critical: chrono::Duration,
    pub standard: chrono::Duration,
}

impl TtlPolicy {
    pub fn new(critical: chrono::Duration, standard: chrono::Duration) -> Self {
        Self { critical, standard }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            critical: config.ttl_for(TtlClass::Critical),
            standard: config.ttl_for(TtlClass::Standard),
        }
    }

    pub fn ttl_for(&self, class: TtlClass) -> chrono::Duration {
        match class {
            TtlClass::Critical => self.critical,
            TtlClass::Standard => self.standard,
        }
    }

    /// An entry inserted at `inserted_at` is served while `now - inserted_at < ttl`.
    pub fn is_fresh(&self, class: TtlClass, inserted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - inserted_at < self.ttl_for(class)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

/// Result of a cache read, carrying staleness metadata.
///
/// Callers can tell whether the value came from the cache or was just built,
/// and how old it is.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    cached_at: DateTime<Utc>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A value served from the cache.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
        }
    }

    /// A value that was just built (cache miss or stale entry).
    pub fn from_build(value: T, built_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at: built_at,
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Age of the value at `now`. Zero if `now` is before the cache time.
    pub fn staleness(&self, now: DateTime<Utc>) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }
}
