//! Context cache with explicit freshness.
//!
//! Reads return [`CacheRead<T>`], which says whether the value was a cache
//! hit and when it was cached, so staleness is never hidden from callers.
//!
//! Cache keys are [`ScopeKey`](tally_core::ScopeKey)s: a key cannot be built
//! without a role, so one role's context can never be served to another.

pub mod context_cache;
pub mod freshness;
pub mod stats;

pub use context_cache::ContextCache;
pub use freshness::{CacheRead, TtlPolicy};
pub use stats::CacheStats;
