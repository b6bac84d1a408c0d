//! Business context: the verified, role-scoped aggregate snapshot handed to
//! the prompt builder, the validator and the fallback composer.

use crate::numeric;
use crate::scope::{Category, Role, ScopeKey};
use crate::Timestamp;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Well-known entry names.
pub mod metric {
    pub const SCOPE: &str = "scope";
    pub const TOTAL_REVENUE: &str = "total_revenue";
    pub const TOTAL_ORDERS: &str = "total_orders";
    pub const AVG_ORDER_VALUE: &str = "avg_order_value";
    pub const LOCATION_COUNT: &str = "location_count";
    pub const REVENUE_TREND: &str = "revenue_trend";
    pub const TOP_LOCATION: &str = "top_location";
    pub const BOTTOM_LOCATION: &str = "bottom_location";
    pub const TOP_PRODUCT: &str = "top_product";

    /// Entries shown when a template only has room for the essentials.
    pub const HEADLINE: [&str; 3] = [TOTAL_REVENUE, TOTAL_ORDERS, AVG_ORDER_VALUE];
}

/// One presentation line of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    /// Stable metric name, e.g. `total_revenue`.
    pub name: String,
    /// Human label, e.g. `Total revenue`.
    pub label: String,
    /// Formatted value exactly as the user will see it, e.g. `$50,211,527.85`.
    pub display: String,
}

impl ContextEntry {
    pub fn new(name: impl Into<String>, label: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            display: display.into(),
        }
    }
}

/// Immutable snapshot of verified business data for one [`ScopeKey`].
///
/// The numeric literal set is derived from the entry displays when the
/// context is constructed and can never drift from them.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessContext {
    key: ScopeKey,
    entries: Vec<ContextEntry>,
    values: BTreeMap<String, f64>,
    literals: BTreeSet<String>,
    created_at: Timestamp,
}

impl BusinessContext {
    /// Build a context from ordered entries and the raw values behind them.
    pub fn new(
        key: ScopeKey,
        entries: Vec<ContextEntry>,
        values: BTreeMap<String, f64>,
        created_at: Timestamp,
    ) -> Self {
        let literals = numeric::literal_set(entries.iter().map(|e| e.display.as_str()));
        Self {
            key,
            entries,
            values,
            literals,
            created_at,
        }
    }

    /// Context carrying only the scope line.
    pub fn scope_only(key: ScopeKey, created_at: Timestamp) -> Self {
        let scope = ContextEntry::new(metric::SCOPE, "Scope", key.role().scope_label());
        Self::new(key, vec![scope], BTreeMap::new(), created_at)
    }

    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    pub fn role(&self) -> &Role {
        self.key.role()
    }

    pub fn category(&self) -> Category {
        self.key.category()
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&ContextEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn display(&self, name: &str) -> Option<&str> {
        self.entry(name).map(|e| e.display.as_str())
    }

    /// Underlying numeric value of a metric entry.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    /// Normalized numeric literals derivable from the displays.
    pub fn literals(&self) -> &BTreeSet<String> {
        &self.literals
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Whether anything besides the scope line made it into the context.
    pub fn has_metrics(&self) -> bool {
        self.entries.iter().any(|e| e.name != metric::SCOPE)
    }

    /// Equality ignoring the creation timestamp.
    pub fn same_content(&self, other: &BusinessContext) -> bool {
        self.key == other.key
            && self.entries == other.entries
            && self.values == other.values
            && self.literals == other.literals
    }
}
