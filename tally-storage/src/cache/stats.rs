/// Statistics about context cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a fresh entry.
    pub hits: u64,
    /// Lookups that built a new context (absent or stale entry).
    pub misses: u64,
    /// Amortized sweeps performed.
    pub sweeps: u64,
    /// Entries removed by sweeps.
    pub evictions: u64,
    /// Entries currently held, fresh or not.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
