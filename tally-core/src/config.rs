//! Assistant configuration.
//!
//! Every field has a default. Values come from `TALLY_*` environment
//! variables or from a TOML file, and are always validated before use.

use crate::error::{ConfigError, TallyError, TallyResult};
use crate::scope::TtlClass;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// ASSISTANT CONFIG
// ============================================================================

/// Tunables for caching, history, prompting, the backend and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssistantConfig {
    /// TTL for analytics contexts, in seconds
    pub critical_ttl_secs: u64,
    /// TTL for all other contexts, in seconds
    pub standard_ttl_secs: u64,
    /// Every Nth cache lookup also sweeps expired entries
    pub sweep_every: u64,
    /// Exchanges kept per session
    pub history_capacity: usize,
    /// Most recent exchanges rendered into a prompt
    pub prompt_history_window: usize,
    /// Upper bound on a single generative backend call, in seconds
    pub backend_timeout_secs: u64,
    /// Revenue values above this are treated as corrupt
    pub revenue_ceiling: f64,
    /// Revenue trend percentages beyond +/- this are treated as corrupt
    pub trend_ceiling_pct: f64,
    /// Allowed relative gap between reported and recomputed AOV
    pub aov_tolerance: f64,
    /// Average order value below which an insight is raised
    pub aov_floor: f64,
    /// Token budget for the reference snippet in a prompt
    pub snippet_token_budget: usize,
    /// Token budget for each history line in a prompt
    pub history_line_token_budget: usize,
    /// Bounded queue between chat turns and the transcript sink
    pub transcript_queue_capacity: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            critical_ttl_secs: 30,
            standard_ttl_secs: 60,
            sweep_every: 64,
            history_capacity: 20,
            prompt_history_window: 10,
            backend_timeout_secs: 30,
            revenue_ceiling: 1e12,
            trend_ceiling_pct: 1000.0,
            aov_tolerance: 0.01,
            aov_floor: 15.0,
            snippet_token_budget: 200,
            history_line_token_budget: 120,
            transcript_queue_capacity: 256,
        }
    }
}

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> TallyError {
    TallyError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

impl AssistantConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `TALLY_CRITICAL_TTL_SECS` (default: 30)
    /// - `TALLY_STANDARD_TTL_SECS` (default: 60)
    /// - `TALLY_SWEEP_EVERY` (default: 64)
    /// - `TALLY_HISTORY_CAPACITY` (default: 20)
    /// - `TALLY_PROMPT_HISTORY_WINDOW` (default: 10)
    /// - `TALLY_BACKEND_TIMEOUT_SECS` (default: 30)
    /// - `TALLY_REVENUE_CEILING` (default: 1e12)
    /// - `TALLY_TREND_CEILING_PCT` (default: 1000.0)
    /// - `TALLY_AOV_TOLERANCE` (default: 0.01)
    /// - `TALLY_AOV_FLOOR` (default: 15.0)
    /// - `TALLY_SNIPPET_TOKEN_BUDGET` (default: 200)
    /// - `TALLY_HISTORY_LINE_TOKEN_BUDGET` (default: 120)
    /// - `TALLY_TRANSCRIPT_QUEUE_CAPACITY` (default: 256)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> TallyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TallyResult<Self> {
        let d = Self::default();
        let config = Self {
            critical_ttl_secs: parse_or(&lookup, "TALLY_CRITICAL_TTL_SECS", d.critical_ttl_secs),
            standard_ttl_secs: parse_or(&lookup, "TALLY_STANDARD_TTL_SECS", d.standard_ttl_secs),
            sweep_every: parse_or(&lookup, "TALLY_SWEEP_EVERY", d.sweep_every),
            history_capacity: parse_or(&lookup, "TALLY_HISTORY_CAPACITY", d.history_capacity),
            prompt_history_window: parse_or(
                &lookup,
                "TALLY_PROMPT_HISTORY_WINDOW",
                d.prompt_history_window,
            ),
            backend_timeout_secs: parse_or(
                &lookup,
                "TALLY_BACKEND_TIMEOUT_SECS",
                d.backend_timeout_secs,
            ),
            revenue_ceiling: parse_or(&lookup, "TALLY_REVENUE_CEILING", d.revenue_ceiling),
            trend_ceiling_pct: parse_or(&lookup, "TALLY_TREND_CEILING_PCT", d.trend_ceiling_pct),
            aov_tolerance: parse_or(&lookup, "TALLY_AOV_TOLERANCE", d.aov_tolerance),
            aov_floor: parse_or(&lookup, "TALLY_AOV_FLOOR", d.aov_floor),
            snippet_token_budget: parse_or(
                &lookup,
                "TALLY_SNIPPET_TOKEN_BUDGET",
                d.snippet_token_budget,
            ),
            history_line_token_budget: parse_or(
                &lookup,
                "TALLY_HISTORY_LINE_TOKEN_BUDGET",
                d.history_line_token_budget,
            ),
            transcript_queue_capacity: parse_or(
                &lookup,
                "TALLY_TRANSCRIPT_QUEUE_CAPACITY",
                d.transcript_queue_capacity,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse from TOML. Missing keys take their defaults; unknown keys are an error.
    pub fn from_toml_str(input: &str) -> TallyResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TallyResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - TTLs, sweep interval, history capacity, timeout and queue capacity are positive
    /// - prompt_history_window does not exceed history_capacity
    /// - revenue_ceiling and trend_ceiling_pct are finite and positive
    /// - aov_tolerance is in [0.0, 1.0]
    /// - aov_floor is non-negative
    pub fn validate(&self) -> TallyResult<()> {
        if self.critical_ttl_secs == 0 {
            return Err(invalid(
                "critical_ttl_secs",
                self.critical_ttl_secs,
                "critical_ttl_secs must be greater than 0",
            ));
        }

        if self.standard_ttl_secs == 0 {
            return Err(invalid(
                "standard_ttl_secs",
                self.standard_ttl_secs,
                "standard_ttl_secs must be greater than 0",
            ));
        }

        if self.sweep_every == 0 {
            return Err(invalid(
                "sweep_every",
                self.sweep_every,
                "sweep_every must be greater than 0",
            ));
        }

        if self.history_capacity == 0 {
            return Err(invalid(
                "history_capacity",
                self.history_capacity,
                "history_capacity must be greater than 0",
            ));
        }

        if self.prompt_history_window > self.history_capacity {
            return Err(invalid(
                "prompt_history_window",
                self.prompt_history_window,
                "prompt_history_window must not exceed history_capacity",
            ));
        }

        if self.backend_timeout_secs == 0 {
            return Err(invalid(
                "backend_timeout_secs",
                self.backend_timeout_secs,
                "backend_timeout_secs must be greater than 0",
            ));
        }

        if !self.revenue_ceiling.is_finite() || self.revenue_ceiling <= 0.0 {
            return Err(invalid(
                "revenue_ceiling",
                self.revenue_ceiling,
                "revenue_ceiling must be a positive finite number",
            ));
        }

        if !self.trend_ceiling_pct.is_finite() || self.trend_ceiling_pct <= 0.0 {
            return Err(invalid(
                "trend_ceiling_pct",
                self.trend_ceiling_pct,
                "trend_ceiling_pct must be a positive finite number",
            ));
        }

        if !(0.0..=1.0).contains(&self.aov_tolerance) {
            return Err(invalid(
                "aov_tolerance",
                self.aov_tolerance,
                "aov_tolerance must be between 0.0 and 1.0",
            ));
        }

        if !self.aov_floor.is_finite() || self.aov_floor < 0.0 {
            return Err(invalid(
                "aov_floor",
                self.aov_floor,
                "aov_floor must be non-negative",
            ));
        }

        if self.transcript_queue_capacity == 0 {
            return Err(invalid(
                "transcript_queue_capacity",
                self.transcript_queue_capacity,
                "transcript_queue_capacity must be greater than 0",
            ));
        }

        Ok(())
    }

    /// TTL for a freshness class.
    pub fn ttl_for(&self, class: TtlClass) -> chrono::Duration {
        let secs = match class {
            TtlClass::Critical => self.critical_ttl_secs,
            TtlClass::Standard => self.standard_ttl_secs,
        };
        chrono::Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn backend_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.backend_timeout_secs)
    }
}

// =============================================================================
// TESTS
// =============================================================================
