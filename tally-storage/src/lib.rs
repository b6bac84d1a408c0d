//! TALLY Storage - In-Process Cache and History
//!
//! Both stores are lock-free concurrent maps owned by the process. Nothing
//! here persists across restarts.

pub mod cache;
pub mod history;

pub use cache::{CacheRead, CacheStats, ContextCache, TtlPolicy};
pub use history::HistoryRing;
