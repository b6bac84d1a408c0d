//! TTL cache of business contexts keyed by [`ScopeKey`].
//!
//! Misses and stale entries are rebuilt synchronously by the caller-supplied
//! builder and replace the old entry wholesale. Expired entries are swept
//! lazily: every `sweep_every`-th lookup also drops everything past its TTL.
//!
//! Concurrent misses on the same key each run the builder; the last insert
//! wins. There is no single-flight coordination.

use super::freshness::{CacheRead, TtlPolicy};
use super::stats::CacheStats;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tally_core::{AssistantConfig, BusinessContext, Clock, Role, ScopeKey, Timestamp, TtlClass};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    context: Arc<BusinessContext>,
    inserted_at: Timestamp,
    ttl_class: TtlClass,
}

/// In-process context cache.
#[derive(Debug)]
pub struct ContextCache {
    entries: DashMap<ScopeKey, CacheEntry>,
    policy: TtlPolicy,
    clock: Arc<dyn Clock>,
    sweep_every: u64,
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    sweeps: AtomicU64,
    evictions: AtomicU64,
}

impl ContextCache {
    pub fn new(policy: TtlPolicy, clock: Arc<dyn Clock>, sweep_every: u64) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            clock,
            sweep_every: sweep_every.max(1),
            lookups: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &AssistantConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(TtlPolicy::from_config(config), clock, config.sweep_every)
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    /// Return the cached context for `key`, building it if absent or stale.
    pub fn get_or_build<F>(&self, key: &ScopeKey, build: F) -> CacheRead<Arc<BusinessContext>>
    where
        F: FnOnce(&ScopeKey) -> BusinessContext,
    {
        let lookup = self.lookups.fetch_add(1, Ordering::Relaxed) + 1;
        let now = self.clock.now();
        if lookup % self.sweep_every == 0 {
            self.sweep(now);
        }

        // The shard guard must be released before the insert below.
        let fresh = self.entries.get(key).and_then(|entry| {
            self.policy
                .is_fresh(entry.ttl_class, entry.inserted_at, now)
                .then(|| (Arc::clone(&entry.context), entry.inserted_at))
        });

        if let Some((context, inserted_at)) = fresh {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(scope = %key, "Context cache hit");
            return CacheRead::from_cache(context, inserted_at);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(scope = %key, "Context cache miss, building");

        let context = Arc::new(build(key));
        let inserted_at = self.clock.now();
        self.entries.insert(
            key.clone(),
            CacheEntry {
                context: Arc::clone(&context),
                inserted_at,
                ttl_class: key.ttl_class(),
            },
        );
        CacheRead::from_build(context, inserted_at)
    }

    /// Drop every entry past its TTL at `now`. Returns how many were removed.
    pub fn sweep(&self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| self.policy.is_fresh(entry.ttl_class, entry.inserted_at, now));
        let removed = before.saturating_sub(self.entries.len());
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        if removed > 0 {
            debug!(removed = removed, "Swept expired contexts");
        }
        removed
    }

    /// Remove one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &ScopeKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every entry for `role`, across categories.
    pub fn invalidate_role(&self, role: &Role) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.role() != role);
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
        }
    }
}
