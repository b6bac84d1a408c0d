//! Deterministic answers composed only from context displays.

use tally_core::{metric, BusinessContext, Category, ContextEntry};

const NO_FIGURES: &str = "I don't have verified figures for your scope right now. \
     Please check the dashboard or try again shortly.";

/// Template-based answer composer used whenever a generated answer cannot be
/// used. Every figure in its output is a context display copied verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackComposer;

fn line(entry: &ContextEntry) -> String {
    format!("{}: {}", entry.label, entry.display)
}

impl FallbackComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(&self, category: Category, context: &BusinessContext) -> String {
        if !context.has_metrics() {
            return match category {
                Category::Greeting => format!("Hello! {}", NO_FIGURES),
                _ => NO_FIGURES.to_string(),
            };
        }

        let scope = context.display(metric::SCOPE).unwrap_or("your scope");
        match category {
            Category::Greeting => format!(
                "Hello! I can answer questions about {} using the latest verified figures.",
                scope
            ),
            Category::Analytics => {
                let lines: Vec<String> = context
                    .entries()
                    .iter()
                    .filter(|e| e.name != metric::SCOPE)
                    .map(|e| format!("- {}", line(e)))
                    .collect();
                format!("Here is the verified summary for {}:\n{}", scope, lines.join("\n"))
            }
            Category::Support => format!(
                "I can't resolve account or technical issues directly; your administrator or \
                 the help center can assist. For reference, the latest verified figures for {} are: {}.",
                scope,
                self.headline(context)
            ),
            Category::General => format!(
                "Here are the latest verified figures for {}: {}.",
                scope,
                self.headline(context)
            ),
        }
    }

    fn headline(&self, context: &BusinessContext) -> String {
        let lines: Vec<String> = metric::HEADLINE
            .iter()
            .filter_map(|name| context.entry(name))
            .map(line)
            .collect();
        if lines.is_empty() {
            // Only secondary entries (ranking, trend) made it into the context.
            context
                .entries()
                .iter()
                .filter(|e| e.name != metric::SCOPE)
                .map(line)
                .collect::<Vec<_>>()
                .join("; ")
        } else {
            lines.join("; ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tally_core::{numeric, Role, ScopeKey};
    use tally_guard::NumericValidator;

    fn hq_context(category: Category) -> BusinessContext {
        BusinessContext::new(
            ScopeKey::new(Role::Hq, category),
            vec![
                ContextEntry::new(metric::SCOPE, "Scope", "All states (HQ)"),
                ContextEntry::new(metric::TOTAL_REVENUE, "Total revenue", "$50,211,527.85"),
                ContextEntry::new(metric::TOTAL_ORDERS, "Total orders", "2,046,713"),
                ContextEntry::new(metric::AVG_ORDER_VALUE, "Average order value", "$24.53"),
                ContextEntry::new(metric::TOP_LOCATION, "Top state", "CA ($9,000,000.50)"),
            ],
            BTreeMap::new(),
            Utc::now(),
        )
    }

    #[test]
    fn test_general_uses_headline() {
        let text = FallbackComposer::new().compose(Category::General, &hq_context(Category::General));
        assert!(text.contains("Total revenue: $50,211,527.85"));
        assert!(text.contains("Total orders: 2,046,713"));
        assert!(!text.contains("Top state"));
    }

    #[test]
    fn test_analytics_lists_every_entry() {
        let ctx = hq_context(Category::Analytics);
        let text = FallbackComposer::new().compose(Category::Analytics, &ctx);
        assert!(text.contains("- Top state: CA ($9,000,000.50)"));
        assert!(text.contains("- Average order value: $24.53"));
    }

    #[test]
    fn test_empty_context_has_no_numbers() {
        let ctx = BusinessContext::scope_only(
            ScopeKey::new(Role::Store("1042".into()), Category::General),
            Utc::now(),
        );
        for category in Category::ALL {
            let text = FallbackComposer::new().compose(category, &ctx);
            assert!(numeric::scan(&text).is_empty(), "{}", text);
            assert!(text.contains("verified figures"));
        }
    }

    #[test]
    fn test_output_always_validates() {
        let validator = NumericValidator::new();
        for category in Category::ALL {
            let ctx = hq_context(category);
            let text = FallbackComposer::new().compose(category, &ctx);
            assert!(validator.validate(&text, &ctx).accepted, "{:?}: {}", category, text);
        }
    }

    #[test]
    fn test_greeting_names_scope() {
        let text = FallbackComposer::new().compose(Category::Greeting, &hq_context(Category::Greeting));
        assert!(text.starts_with("Hello!"));
        assert!(text.contains("All states (HQ)"));
    }
}
