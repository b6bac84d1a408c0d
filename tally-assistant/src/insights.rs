//! Recommendations derived from an analytics context.

use tally_core::{
    metric, AssistantConfig, BusinessContext, Insight, InsightKind, InsightPriority,
};

/// Turns the numeric values of a context into [`Insight`]s.
///
/// Detail text only quotes context displays, so insights are held to the
/// same numeric guard-rail as chat answers.
#[derive(Debug, Clone)]
pub struct InsightEngine {
    aov_floor: f64,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

impl InsightEngine {
    pub fn new(aov_floor: f64) -> Self {
        Self { aov_floor }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(config.aov_floor)
    }

    pub fn derive(&self, context: &BusinessContext) -> Vec<Insight> {
        let scope = context.display(metric::SCOPE).unwrap_or("this scope");
        let mut insights = Vec::new();

        let missing: Vec<&str> = [metric::TOTAL_REVENUE, metric::TOTAL_ORDERS]
            .into_iter()
            .filter(|name| context.entry(name).is_none())
            .collect();
        if !missing.is_empty() {
            insights.push(Insight::new(
                InsightKind::DataQuality,
                InsightPriority::High,
                "Headline data missing",
                format!(
                    "{} not available for {}. Check the upstream sales feed.",
                    missing.join(" and "),
                    scope
                ),
            ));
        }

        if let (Some(trend), Some(display)) = (
            context.value(metric::REVENUE_TREND),
            context.display(metric::REVENUE_TREND),
        ) {
            if trend < 0.0 {
                insights.push(
                    Insight::new(
                        InsightKind::Risk,
                        InsightPriority::High,
                        "Revenue is declining",
                        format!("Revenue changed {} versus the previous period in {}.", display, scope),
                    )
                    .with_metric(metric::REVENUE_TREND),
                );
            } else if trend > 0.0 {
                insights.push(
                    Insight::new(
                        InsightKind::Opportunity,
                        InsightPriority::Medium,
                        "Revenue is growing",
                        format!(
                            "Revenue changed {} versus the previous period in {}. Keep the current plan funded.",
                            display, scope
                        ),
                    )
                    .with_metric(metric::REVENUE_TREND),
                );
            }
        }

        if let Some(bottom) = context.entry(metric::BOTTOM_LOCATION) {
            insights.push(
                Insight::new(
                    InsightKind::Action,
                    InsightPriority::Medium,
                    "Support the lowest performer",
                    format!(
                        "{}: {}. Review staffing and promotions there.",
                        bottom.label, bottom.display
                    ),
                )
                .with_metric(metric::BOTTOM_LOCATION),
            );
        }

        if let Some(top) = context.entry(metric::TOP_LOCATION) {
            insights.push(
                Insight::new(
                    InsightKind::Opportunity,
                    InsightPriority::Low,
                    "Replicate what works",
                    format!("{}: {}. Share its playbook with other locations.", top.label, top.display),
                )
                .with_metric(metric::TOP_LOCATION),
            );
        }

        if let Some(product) = context.display(metric::TOP_PRODUCT) {
            insights.push(
                Insight::new(
                    InsightKind::Opportunity,
                    InsightPriority::Low,
                    "Feature the top product",
                    format!("Best seller: {}. Keep it stocked and visible.", product),
                )
                .with_metric(metric::TOP_PRODUCT),
            );
        }

        if let (Some(aov), Some(display)) = (
            context.value(metric::AVG_ORDER_VALUE),
            context.display(metric::AVG_ORDER_VALUE),
        ) {
            if aov < self.aov_floor {
                insights.push(
                    Insight::new(
                        InsightKind::Action,
                        InsightPriority::Medium,
                        "Raise average order value",
                        format!(
                            "Average order value is {}, below target. Consider bundles or add-on prompts.",
                            display
                        ),
                    )
                    .with_metric(metric::AVG_ORDER_VALUE),
                );
            }
        }

        insights.sort_by(Insight::display_order);
        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tally_core::{Category, ContextEntry, Role, ScopeKey};
    use tally_guard::NumericValidator;

    fn context(entries: Vec<(&str, &str, &str, Option<f64>)>) -> BusinessContext {
        let mut values = BTreeMap::new();
        let mut rows = vec![ContextEntry::new(metric::SCOPE, "Scope", "State CA")];
        for (name, label, display, value) in entries {
            rows.push(ContextEntry::new(name, label, display));
            if let Some(v) = value {
                values.insert(name.to_string(), v);
            }
        }
        BusinessContext::new(
            ScopeKey::new(Role::State("CA".into()), Category::Analytics),
            rows,
            values,
            Utc::now(),
        )
    }

    fn full_context(trend: f64, trend_display: &str, aov: f64, aov_display: &str) -> BusinessContext {
        context(vec![
            (metric::TOTAL_REVENUE, "Total revenue", "$1,200,000.00", Some(1_200_000.0)),
            (metric::TOTAL_ORDERS, "Total orders", "100,000", Some(100_000.0)),
            (metric::AVG_ORDER_VALUE, "Average order value", aov_display, Some(aov)),
            (metric::REVENUE_TREND, "Revenue trend vs previous period", trend_display, Some(trend)),
            (metric::TOP_LOCATION, "Top store", "1042 ($400,000.00)", Some(400_000.0)),
            (metric::BOTTOM_LOCATION, "Lowest store", "2210 ($90,000.00)", Some(90_000.0)),
        ])
    }

    #[test]
    fn test_declining_trend_is_high_risk_first() {
        let insights = InsightEngine::new(15.0).derive(&full_context(-3.0, "-3.0%", 12.0, "$12.00"));
        assert_eq!(insights[0].kind, InsightKind::Risk);
        assert_eq!(insights[0].priority, InsightPriority::High);
        assert!(insights[0].detail.contains("-3.0%"));
        assert!(insights.iter().any(|i| i.title == "Raise average order value"));
        assert!(insights.iter().any(|i| i.title == "Support the lowest performer"));
    }

    #[test]
    fn test_growth_and_healthy_aov() {
        let insights = InsightEngine::new(15.0).derive(&full_context(4.2, "+4.2%", 24.53, "$24.53"));
        assert!(insights.iter().any(|i| i.kind == InsightKind::Opportunity && i.title == "Revenue is growing"));
        assert!(!insights.iter().any(|i| i.kind == InsightKind::Risk));
        assert!(!insights.iter().any(|i| i.title == "Raise average order value"));
    }

    #[test]
    fn test_missing_headline_is_data_quality() {
        let insights = InsightEngine::default().derive(&context(vec![]));
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::DataQuality);
        assert!(insights[0].detail.contains("total_revenue and total_orders"));
    }

    #[test]
    fn test_sorted_by_priority_then_title() {
        let insights = InsightEngine::new(15.0).derive(&full_context(-3.0, "-3.0%", 12.0, "$12.00"));
        for pair in insights.windows(2) {
            assert_ne!(Insight::display_order(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
        }
    }

    #[test]
    fn test_details_pass_numeric_validation() {
        let ctx = full_context(-3.0, "-3.0%", 12.0, "$12.00");
        let validator = NumericValidator::new();
        for insight in InsightEngine::new(15.0).derive(&ctx) {
            assert!(validator.validate(&insight.detail, &ctx).accepted, "{}", insight.detail);
        }
    }
}
