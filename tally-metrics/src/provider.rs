//! Metrics provider seam.
//!
//! The aggregate store lives outside this workspace. It is reached through
//! [`MetricsProvider`], which hands back loosely typed JSON records that the
//! normalizer turns into numbers.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tally_core::{MetricsError, Role, RoleCapabilities, ScopeKey, TallyError, TallyResult};

/// One loosely typed aggregate row, normally a JSON object.
pub type MetricRecord = serde_json::Value;

/// Aggregate family requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Summary,
    Trend,
    StateRanking,
    StoreRanking,
    ProductMix,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 5] = [
        AggregateKind::Summary,
        AggregateKind::Trend,
        AggregateKind::StateRanking,
        AggregateKind::StoreRanking,
        AggregateKind::ProductMix,
    ];

    /// Capability a role needs to request this aggregate.
    pub fn capability(self) -> RoleCapabilities {
        match self {
            Self::Summary => RoleCapabilities::SUMMARY,
            Self::Trend => RoleCapabilities::TREND,
            Self::StateRanking => RoleCapabilities::STATE_RANKING,
            Self::StoreRanking => RoleCapabilities::STORE_RANKING,
            Self::ProductMix => RoleCapabilities::PRODUCT_MIX,
        }
    }

    /// Aggregates a context for `key` is built from, in entry order.
    ///
    /// Everything but the summary is only fetched for analytics questions.
    pub fn plan(key: &ScopeKey) -> Vec<AggregateKind> {
        let caps = key.role().capabilities();
        let analytics = key.category().is_analytics();
        Self::ALL
            .into_iter()
            .filter(|kind| caps.contains(kind.capability()))
            .filter(|kind| analytics || *kind == Self::Summary)
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Trend => "trend",
            Self::StateRanking => "state_ranking",
            Self::StoreRanking => "store_ranking",
            Self::ProductMix => "product_mix",
        }
    }
}

/// Source of role-scoped aggregate records.
///
/// Implementations must only return rows inside the key's scope.
pub trait MetricsProvider: Send + Sync {
    fn fetch_aggregate(&self, key: &ScopeKey, kind: AggregateKind)
        -> TallyResult<Vec<MetricRecord>>;

    /// Name used in logs.
    fn provider_name(&self) -> &str {
        "metrics"
    }
}

// ============================================================================
// IN-MEMORY PROVIDER
// ============================================================================

/// Provider serving records registered per role and aggregate kind.
///
/// Unregistered combinations return no rows.
#[derive(Debug, Default)]
pub struct InMemoryMetricsProvider {
    records: DashMap<(Role, AggregateKind), Vec<MetricRecord>>,
    failures: DashMap<(Role, AggregateKind), MetricsError>,
}

impl InMemoryMetricsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rows served for `(role, kind)`.
    pub fn set_records(&self, role: Role, kind: AggregateKind, records: Vec<MetricRecord>) {
        self.failures.remove(&(role.clone(), kind));
        self.records.insert((role, kind), records);
    }

    pub fn with_records(self, role: Role, kind: AggregateKind, records: Vec<MetricRecord>) -> Self {
        self.set_records(role, kind, records);
        self
    }

    /// Make `(role, kind)` fail until records are set again.
    pub fn fail_with(&self, role: Role, kind: AggregateKind, error: MetricsError) {
        self.failures.insert((role, kind), error);
    }
}

impl MetricsProvider for InMemoryMetricsProvider {
    fn fetch_aggregate(
        &self,
        key: &ScopeKey,
        kind: AggregateKind,
    ) -> TallyResult<Vec<MetricRecord>> {
        let lookup = (key.role().clone(), kind);
        if let Some(err) = self.failures.get(&lookup) {
            return Err(TallyError::Metrics(err.value().clone()));
        }
        Ok(self
            .records
            .get(&lookup)
            .map(|rows| rows.value().clone())
            .unwrap_or_default())
    }

    fn provider_name(&self) -> &str {
        "in-memory"
    }
}
