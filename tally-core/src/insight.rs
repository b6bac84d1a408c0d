//! Structured recommendations produced by the insights capability.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Risk,
    Opportunity,
    Action,
    DataQuality,
}

/// Ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub priority: InsightPriority,
    pub title: String,
    /// Free text; any figure in it is copied from a context display.
    pub detail: String,
    /// Context entry the insight is derived from, if any.
    pub metric: Option<String>,
}

impl Insight {
    pub fn new(
        kind: InsightKind,
        priority: InsightPriority,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            priority,
            title: title.into(),
            detail: detail.into(),
            metric: None,
        }
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }

    /// Priority descending, then title ascending.
    pub fn display_order(a: &Insight, b: &Insight) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.title.cmp(&b.title))
    }
}
