//! Business context builder.
//!
//! Turns role-scoped aggregate records into an immutable [`BusinessContext`].
//! The build never fails: missing, corrupt or inconsistent values are
//! reported in a [`ContextBuildReport`] and either omitted or kept with a
//! warning.

use crate::format::{format_count, format_currency, format_percent_change};
use crate::normalize::{extract_integer, extract_numeric, extract_text};
use crate::provider::{AggregateKind, MetricRecord, MetricsProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tally_core::{metric, AssistantConfig, BusinessContext, Clock, ContextEntry, Role, ScopeKey};
use tracing::{debug, warn};

// ============================================================================
// FIELD ALIASES
// ============================================================================

const REVENUE_ALIASES: &[&str] = &["total_revenue", "revenue", "sales", "gross_sales"];
const ORDERS_ALIASES: &[&str] = &["total_orders", "orders", "order_count", "transactions"];
const AOV_ALIASES: &[&str] = &["avg_order_value", "aov", "average_order_value"];
const LOCATION_COUNT_ALIASES: &[&str] = &["location_count", "state_count", "store_count"];
const TREND_ALIASES: &[&str] = &["revenue_trend", "pct_change", "change_pct"];
const CURRENT_REVENUE_ALIASES: &[&str] = &["current_revenue", "current_period_revenue"];
const PREVIOUS_REVENUE_ALIASES: &[&str] = &["previous_revenue", "prior_period_revenue"];
const LOCATION_NAME_ALIASES: &[&str] = &["name", "location", "state", "store_id", "store"];
const PRODUCT_NAME_ALIASES: &[&str] = &["product", "product_name", "name"];
const UNITS_ALIASES: &[&str] = &["units", "units_sold", "quantity"];

// ============================================================================
// BUILD REPORT
// ============================================================================

/// How serious a build issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Kept in the context, but suspicious or incomplete
    Warning,
    /// Left out of the context
    Dropped,
}

/// What went wrong with a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    /// A required field for the role is absent
    MissingRequired,
    /// Value outside its sane range
    OutOfRange,
    /// Value disagrees with other metrics
    Inconsistent,
    /// The provider call failed
    ProviderFailure,
}

/// A single problem found while building a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildIssue {
    pub severity: Severity,
    pub issue_type: IssueType,
    /// Metric name or aggregate kind the issue is about
    pub subject: String,
    /// Human-readable message
    pub message: String,
}

/// Diagnostics for one build. Never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBuildReport {
    pub issues: Vec<BuildIssue>,
}

impl ContextBuildReport {
    pub fn add_issue(&mut self, issue: BuildIssue) {
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_dropped(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Dropped)
    }

    pub fn issues_of(&self, issue_type: IssueType) -> impl Iterator<Item = &BuildIssue> {
        self.issues.iter().filter(move |i| i.issue_type == issue_type)
    }

    fn record(&mut self, severity: Severity, issue_type: IssueType, subject: &str, message: String) {
        warn!(
            subject = subject,
            severity = ?severity,
            issue_type = ?issue_type,
            "{}",
            message
        );
        self.add_issue(BuildIssue {
            severity,
            issue_type,
            subject: subject.to_string(),
            message,
        });
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Entries and values accumulated during a build.
#[derive(Default)]
struct Draft {
    entries: Vec<ContextEntry>,
    values: BTreeMap<String, f64>,
}

impl Draft {
    fn push(&mut self, name: &str, label: &str, display: String, value: Option<f64>) {
        self.entries.push(ContextEntry::new(name, label, display));
        if let Some(v) = value {
            self.values.insert(name.to_string(), v);
        }
    }
}

/// Builds [`BusinessContext`]s from a [`MetricsProvider`].
#[derive(Clone)]
pub struct BusinessContextBuilder {
    provider: Arc<dyn MetricsProvider>,
    clock: Arc<dyn Clock>,
    revenue_ceiling: f64,
    trend_ceiling_pct: f64,
    aov_tolerance: f64,
}

impl std::fmt::Debug for BusinessContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusinessContextBuilder")
            .field("provider", &self.provider.provider_name())
            .field("revenue_ceiling", &self.revenue_ceiling)
            .field("trend_ceiling_pct", &self.trend_ceiling_pct)
            .field("aov_tolerance", &self.aov_tolerance)
            .finish()
    }
}

impl BusinessContextBuilder {
    pub fn new(
        provider: Arc<dyn MetricsProvider>,
        clock: Arc<dyn Clock>,
        config: &AssistantConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            revenue_ceiling: config.revenue_ceiling,
            trend_ceiling_pct: config.trend_ceiling_pct,
            aov_tolerance: config.aov_tolerance,
        }
    }

    /// Build the context for `key`, discarding diagnostics.
    pub fn build(&self, key: &ScopeKey) -> BusinessContext {
        self.build_with_report(key).0
    }

    /// Build the context for `key` along with what was dropped or flagged.
    pub fn build_with_report(&self, key: &ScopeKey) -> (BusinessContext, ContextBuildReport) {
        let mut report = ContextBuildReport::default();
        let mut draft = Draft::default();
        draft.push(metric::SCOPE, "Scope", key.role().scope_label(), None);

        for kind in AggregateKind::plan(key) {
            let records = self.fetch(key, kind, &mut report);
            match kind {
                AggregateKind::Summary => {
                    self.apply_summary(key.role(), records.first(), &mut draft, &mut report)
                }
                AggregateKind::Trend => self.apply_trend(records.first(), &mut draft, &mut report),
                AggregateKind::StateRanking | AggregateKind::StoreRanking => {
                    self.apply_ranking(key.role(), &records, &mut draft, &mut report)
                }
                AggregateKind::ProductMix => self.apply_product_mix(&records, &mut draft),
            }
        }

        debug!(
            scope = %key,
            entries = draft.entries.len(),
            issues = report.issues.len(),
            "Built business context"
        );

        let context = BusinessContext::new(key.clone(), draft.entries, draft.values, self.clock.now());
        (context, report)
    }

    fn fetch(
        &self,
        key: &ScopeKey,
        kind: AggregateKind,
        report: &mut ContextBuildReport,
    ) -> Vec<MetricRecord> {
        match self.provider.fetch_aggregate(key, kind) {
            Ok(records) => records,
            Err(e) => {
                report.record(
                    Severity::Dropped,
                    IssueType::ProviderFailure,
                    kind.as_str(),
                    format!(
                        "{} provider failed for {}: {}",
                        self.provider.provider_name(),
                        kind.as_str(),
                        e
                    ),
                );
                Vec::new()
            }
        }
    }

    fn revenue_in_range(&self, value: f64) -> bool {
        value.is_finite() && value >= 0.0 && value <= self.revenue_ceiling
    }

    fn apply_summary(
        &self,
        role: &Role,
        record: Option<&MetricRecord>,
        draft: &mut Draft,
        report: &mut ContextBuildReport,
    ) {
        let empty = MetricRecord::Object(Default::default());
        let record = record.unwrap_or(&empty);

        let revenue = match extract_numeric(record, REVENUE_ALIASES) {
            None => {
                report.record(
                    Severity::Warning,
                    IssueType::MissingRequired,
                    metric::TOTAL_REVENUE,
                    format!("total_revenue missing for {}", role),
                );
                None
            }
            Some(v) if !self.revenue_in_range(v) => {
                report.record(
                    Severity::Dropped,
                    IssueType::OutOfRange,
                    metric::TOTAL_REVENUE,
                    format!("total_revenue {} outside [0, {}]", v, self.revenue_ceiling),
                );
                None
            }
            Some(v) => Some(v),
        };

        let orders = match extract_integer(record, ORDERS_ALIASES) {
            None => {
                report.record(
                    Severity::Warning,
                    IssueType::MissingRequired,
                    metric::TOTAL_ORDERS,
                    format!("total_orders missing for {}", role),
                );
                None
            }
            Some(n) if n < 0 => {
                report.record(
                    Severity::Dropped,
                    IssueType::OutOfRange,
                    metric::TOTAL_ORDERS,
                    format!("total_orders {} is negative", n),
                );
                None
            }
            Some(n) => Some(n),
        };

        let reported_aov = match extract_numeric(record, AOV_ALIASES) {
            Some(v) if !self.revenue_in_range(v) => {
                report.record(
                    Severity::Dropped,
                    IssueType::OutOfRange,
                    metric::AVG_ORDER_VALUE,
                    format!("avg_order_value {} is out of range", v),
                );
                None
            }
            other => other,
        };

        let recomputed_aov = match (revenue, orders) {
            (Some(r), Some(o)) if o > 0 => Some(r / o as f64),
            _ => None,
        };

        let aov = match (reported_aov, recomputed_aov) {
            (Some(reported), Some(expected)) => {
                let denominator = expected.abs().max(f64::EPSILON);
                let gap = (reported - expected).abs() / denominator;
                if gap > self.aov_tolerance {
                    report.record(
                        Severity::Warning,
                        IssueType::Inconsistent,
                        metric::AVG_ORDER_VALUE,
                        format!(
                            "avg_order_value {:.2} differs from revenue/orders {:.2} by {:.2}%",
                            reported,
                            expected,
                            gap * 100.0
                        ),
                    );
                }
                Some(reported)
            }
            (Some(reported), None) => Some(reported),
            (None, Some(expected)) => {
                debug!(aov = expected, "Derived avg_order_value from revenue and orders");
                Some(expected)
            }
            (None, None) => None,
        };

        if let Some(r) = revenue {
            draft.push(metric::TOTAL_REVENUE, "Total revenue", format_currency(r), Some(r));
        }
        if let Some(o) = orders {
            draft.push(metric::TOTAL_ORDERS, "Total orders", format_count(o), Some(o as f64));
        }
        if let Some(a) = aov {
            draft.push(metric::AVG_ORDER_VALUE, "Average order value", format_currency(a), Some(a));
        }

        if let Some(children) = role.child_locations() {
            match extract_integer(record, LOCATION_COUNT_ALIASES) {
                Some(n) if n < 0 => report.record(
                    Severity::Dropped,
                    IssueType::OutOfRange,
                    metric::LOCATION_COUNT,
                    format!("location_count {} is negative", n),
                ),
                Some(n) => {
                    let label = if children == "states" {
                        "States reporting"
                    } else {
                        "Stores reporting"
                    };
                    draft.push(metric::LOCATION_COUNT, label, format_count(n), Some(n as f64));
                }
                None => {}
            }
        }
    }

    fn apply_trend(
        &self,
        record: Option<&MetricRecord>,
        draft: &mut Draft,
        report: &mut ContextBuildReport,
    ) {
        let Some(record) = record else {
            return;
        };

        let trend = extract_numeric(record, TREND_ALIASES).or_else(|| {
            let current = extract_numeric(record, CURRENT_REVENUE_ALIASES)?;
            let previous = extract_numeric(record, PREVIOUS_REVENUE_ALIASES)?;
            (previous > 0.0).then(|| (current - previous) / previous * 100.0)
        });

        match trend {
            Some(t) if !t.is_finite() => report.record(
                Severity::Dropped,
                IssueType::OutOfRange,
                metric::REVENUE_TREND,
                "revenue_trend is not finite".to_string(),
            ),
            Some(t) if t.abs() > self.trend_ceiling_pct => report.record(
                Severity::Dropped,
                IssueType::OutOfRange,
                metric::REVENUE_TREND,
                format!(
                    "revenue_trend {} outside [-{}, {}]",
                    t, self.trend_ceiling_pct, self.trend_ceiling_pct
                ),
            ),
            Some(t) => draft.push(
                metric::REVENUE_TREND,
                "Revenue trend vs previous period",
                format_percent_change(t),
                Some(t),
            ),
            None => {}
        }
    }

    fn apply_ranking(
        &self,
        role: &Role,
        records: &[MetricRecord],
        draft: &mut Draft,
        report: &mut ContextBuildReport,
    ) {
        let mut ranked: Vec<(String, f64)> = Vec::with_capacity(records.len());
        for record in records {
            let Some(name) = extract_text(record, LOCATION_NAME_ALIASES) else {
                continue;
            };
            match extract_numeric(record, REVENUE_ALIASES) {
                Some(v) if self.revenue_in_range(v) => ranked.push((name, v)),
                Some(v) => report.record(
                    Severity::Dropped,
                    IssueType::OutOfRange,
                    metric::TOP_LOCATION,
                    format!("ranking revenue {} for {} is out of range", v, name),
                ),
                None => {}
            }
        }
        if ranked.is_empty() {
            return;
        }

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let (top_label, bottom_label) = match role.child_locations() {
            Some("stores") => ("Top store", "Lowest store"),
            _ => ("Top state", "Lowest state"),
        };

        let (name, revenue) = &ranked[0];
        draft.push(
            metric::TOP_LOCATION,
            top_label,
            format!("{} ({})", name, format_currency(*revenue)),
            Some(*revenue),
        );

        if ranked.len() > 1 {
            if let Some((name, revenue)) = ranked.last() {
                draft.push(
                    metric::BOTTOM_LOCATION,
                    bottom_label,
                    format!("{} ({})", name, format_currency(*revenue)),
                    Some(*revenue),
                );
            }
        }
    }

    fn apply_product_mix(&self, records: &[MetricRecord], draft: &mut Draft) {
        let top = records
            .iter()
            .filter_map(|record| {
                let name = extract_text(record, PRODUCT_NAME_ALIASES)?;
                let units = extract_integer(record, UNITS_ALIASES).filter(|u| *u >= 0)?;
                Some((name, units))
            })
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));

        if let Some((name, units)) = top {
            draft.push(
                metric::TOP_PRODUCT,
                "Top product",
                format!("{} ({} units)", name, format_count(units)),
                Some(units as f64),
            );
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::provider::InMemoryMetricsProvider;
    use proptest::prelude::*;
    use serde_json::json;
    use tally_core::{numeric, Category, SystemClock};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_literals_match_displays(
            cents in 0i64..1_000_000_000_000,
            orders in 0i64..100_000_000,
            states in 0i64..60,
        ) {
            let provider = InMemoryMetricsProvider::new().with_records(
                Role::Hq,
                AggregateKind::Summary,
                vec![json!({
                    "total_revenue": cents as f64 / 100.0,
                    "total_orders": orders,
                    "location_count": states
                })],
            );
            let b = BusinessContextBuilder::new(
                Arc::new(provider),
                Arc::new(SystemClock),
                &AssistantConfig::default(),
            );
            let key = ScopeKey::new(Role::Hq, Category::General);
            let first = b.build(&key);
            let second = b.build(&key);

            prop_assert!(first.same_content(&second));
            let expected = numeric::literal_set(first.entries().iter().map(|e| e.display.as_str()));
            prop_assert_eq!(first.literals(), &expected);
        }
    }
}
