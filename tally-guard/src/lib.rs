//! TALLY Guard - Numeric Consistency Validator
//!
//! Every figure in a generated answer must be traceable to the verified
//! context it was generated from. The validator scans the answer with the
//! shared tokenizer in [`tally_core::numeric`] and checks each token against
//! the context's literal set, so "traceable" means exactly "written in one of
//! the context displays".

use std::collections::BTreeSet;
use tally_core::numeric;
use tally_core::{BusinessContext, ValidationOutcome};
use tracing::{debug, warn};

/// Checks generated text against a [`BusinessContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericValidator;

impl NumericValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `text` against the literal set of `context`.
    ///
    /// Text without any numbers is accepted.
    pub fn validate(&self, text: &str, context: &BusinessContext) -> ValidationOutcome {
        let outcome = self.validate_against(text, context.literals());
        if outcome.is_rejected() {
            warn!(
                scope = %context.key(),
                rejected = ?outcome.rejected_tokens,
                "Generated text contains figures not present in the verified context"
            );
        }
        outcome
    }

    /// Validate `text` against an explicit set of normalized literals.
    pub fn validate_against(&self, text: &str, reference: &BTreeSet<String>) -> ValidationOutcome {
        let tokens = numeric::scan(text);
        if tokens.is_empty() {
            return ValidationOutcome::accept();
        }

        let rejected: BTreeSet<String> = tokens
            .into_iter()
            .filter(|token| !numeric::is_referenced(&token.normalized, reference))
            .map(|token| token.normalized)
            .collect();

        debug!(rejected = rejected.len(), "Numeric validation complete");
        ValidationOutcome::from_rejections(rejected)
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use tally_core::{metric, Category, ContextEntry, Role, ScopeKey};

    fn money(cents: u64) -> String {
        let whole = (cents / 100).to_string();
        let mut grouped = String::new();
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!("${}.{:02}", grouped, cents % 100)
    }

    fn context_for(revenue_cents: u64, orders: u64) -> BusinessContext {
        BusinessContext::new(
            ScopeKey::new(Role::State("CA".into()), Category::Analytics),
            vec![
                ContextEntry::new(metric::TOTAL_REVENUE, "Total revenue", money(revenue_cents)),
                ContextEntry::new(metric::TOTAL_ORDERS, "Total orders", orders.to_string()),
            ],
            BTreeMap::new(),
            Utc::now(),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_displays_always_validate(revenue in 0u64..10_000_000_000_000, orders in 0u64..100_000_000) {
            let ctx = context_for(revenue, orders);
            let text = format!("Revenue was {} over {} orders.", money(revenue), orders);
            prop_assert!(NumericValidator::new().validate(&text, &ctx).accepted);
        }

        #[test]
        fn prop_unknown_integer_rejected(orders in 0u64..1_000_000, other in 0u64..1_000_000) {
            // Zero would match the "$0.00" revenue line.
            prop_assume!(orders != other && other != 0);
            let ctx = context_for(0, orders);
            let text = format!("There were {} orders.", other);
            let outcome = NumericValidator::new().validate(&text, &ctx);
            prop_assert!(outcome.is_rejected());
            prop_assert!(outcome.rejected_tokens.contains(&other.to_string()));
        }

        #[test]
        fn prop_words_only_accepted(text in "[a-zA-Z ,!?]{0,200}") {
            let ctx = context_for(1, 1);
            prop_assert!(NumericValidator::new().validate(&text, &ctx).accepted);
        }
    }
}
