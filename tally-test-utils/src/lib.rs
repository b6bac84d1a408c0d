//! TALLY Test Utilities
//!
//! Centralized test infrastructure for the TALLY workspace:
//! - Scripted and counting collaborators
//! - Proptest generators for roles, categories and aggregate records
//! - Fixtures for the reference HQ dataset
//! - Custom assertions for numeric traceability

pub use tally_core::{
    metric, AssistantConfig, BusinessContext, Category, ChatExchange, Clock, LlmError,
    ManualClock, Role, ScopeKey, TallyError, TallyResult, Timestamp,
};
pub use tally_metrics::{AggregateKind, InMemoryMetricsProvider, MetricRecord, MetricsProvider};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tally_llm::GenerativeBackend;

// ============================================================================
// COUNTING METRICS PROVIDER
// ============================================================================

/// Wraps a provider and counts calls per aggregate kind.
pub struct CountingMetricsProvider {
    inner: Arc<dyn MetricsProvider>,
    calls: [AtomicUsize; AggregateKind::ALL.len()],
}

impl CountingMetricsProvider {
    pub fn new(inner: Arc<dyn MetricsProvider>) -> Self {
        Self {
            inner,
            calls: Default::default(),
        }
    }

    fn slot(kind: AggregateKind) -> usize {
        AggregateKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default()
    }

    /// Calls for one aggregate kind.
    pub fn calls_for(&self, kind: AggregateKind) -> usize {
        self.calls[Self::slot(kind)].load(Ordering::SeqCst)
    }

    /// Summary fetches, i.e. the number of context builds.
    pub fn builds(&self) -> usize {
        self.calls_for(AggregateKind::Summary)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }
}

impl MetricsProvider for CountingMetricsProvider {
    fn fetch_aggregate(&self, key: &ScopeKey, kind: AggregateKind) -> TallyResult<Vec<MetricRecord>> {
        self.calls[Self::slot(kind)].fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_aggregate(key, kind)
    }

    fn provider_name(&self) -> &str {
        "counting"
    }
}

// ============================================================================
// SCRIPTED BACKEND
// ============================================================================

/// One scripted backend response.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Reply(String),
    Fail(LlmError),
}

/// Backend that plays back a fixed sequence of responses, then repeats the
/// last one. Records every prompt it receives.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    steps: Mutex<VecDeque<ScriptStep>>,
    last: Mutex<Option<ScriptStep>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Backend replying with `replies` in order.
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| ScriptStep::Reply(r.into())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn next_step(&self) -> Option<ScriptStep> {
        let next = self.steps.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match next {
            Some(step) => {
                *last = Some(step.clone());
                Some(step)
            }
            None => last.clone(),
        }
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, prompt: &str) -> TallyResult<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        match self.next_step() {
            Some(ScriptStep::Reply(text)) => Ok(text),
            Some(ScriptStep::Fail(e)) => Err(e.into()),
            None => Err(LlmError::EmptyResponse {
                provider: "scripted".to_string(),
            }
            .into()),
        }
    }

    fn backend_name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for TALLY types.

    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    /// Any of the three role variants with realistic identifiers.
    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Hq),
            "[A-Z]{2}".prop_map(Role::State),
            (1u32..10_000).prop_map(|n| Role::Store(n.to_string())),
        ]
    }

    pub fn arb_category() -> impl Strategy<Value = Category> {
        prop::sample::select(Category::ALL.to_vec())
    }

    pub fn arb_scope_key() -> impl Strategy<Value = ScopeKey> {
        (arb_role(), arb_category()).prop_map(|(role, category)| ScopeKey::new(role, category))
    }

    /// Timestamps between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64)
            .prop_map(|secs| chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    /// Summary row with revenue in cents precision and a positive order count.
    pub fn arb_summary_record() -> impl Strategy<Value = MetricRecord> {
        (0u64..1_000_000_000_000, 1i64..50_000_000, 1i64..500).prop_map(|(cents, orders, locations)| {
            json!({
                "total_revenue": cents as f64 / 100.0,
                "total_orders": orders,
                "location_count": locations,
            })
        })
    }

    /// Summary row whose values arrive as formatted strings, the way some
    /// upstream exports deliver them.
    pub fn arb_string_summary_record() -> impl Strategy<Value = MetricRecord> {
        (0u64..100_000_000, 1i64..1_000_000).prop_map(|(dollars, orders)| {
            json!({
                "revenue": format!("${}.00", dollars),
                "orders": orders.to_string(),
            })
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for the reference HQ dataset.

    use super::*;
    use serde_json::json;
    use tally_metrics::BusinessContextBuilder;

    pub const HQ_REVENUE: &str = "$50,211,527.85";
    pub const HQ_ORDERS: &str = "2,046,713";
    pub const HQ_AOV: &str = "$24.53";

    pub fn hq_summary_record() -> MetricRecord {
        json!({"total_revenue": 50211527.85, "total_orders": 2046713, "location_count": 12})
    }

    /// Provider with HQ summary, trend and state ranking.
    pub fn hq_provider() -> InMemoryMetricsProvider {
        InMemoryMetricsProvider::new()
            .with_records(Role::Hq, AggregateKind::Summary, vec![hq_summary_record()])
            .with_records(Role::Hq, AggregateKind::Trend, vec![json!({"revenue_trend": 4.2})])
            .with_records(
                Role::Hq,
                AggregateKind::StateRanking,
                vec![
                    json!({"state": "CA", "revenue": 9120344.10}),
                    json!({"state": "TX", "revenue": 7880121.44}),
                ],
            )
    }

    /// Clock fixed at the Unix epoch.
    pub fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::at_epoch())
    }

    /// HQ context built through the real builder.
    pub fn hq_context(category: Category) -> BusinessContext {
        BusinessContextBuilder::new(
            Arc::new(hq_provider()),
            manual_clock(),
            &AssistantConfig::default(),
        )
        .build(&ScopeKey::new(Role::Hq, category))
    }

    /// Default config with the given history capacity.
    pub fn config_with_history(capacity: usize) -> AssistantConfig {
        AssistantConfig {
            history_capacity: capacity,
            prompt_history_window: capacity.min(10),
            ..AssistantConfig::default()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for TALLY-specific invariants.

    use super::*;
    use tally_core::numeric;

    /// Assert that every figure in `text` appears in `context`.
    #[track_caller]
    pub fn assert_only_context_numbers(text: &str, context: &BusinessContext) {
        let foreign: Vec<String> = numeric::scan(text)
            .into_iter()
            .filter(|t| !numeric::is_referenced(&t.normalized, context.literals()))
            .map(|t| t.raw)
            .collect();
        assert!(
            foreign.is_empty(),
            "Figures {:?} not in context literals {:?}: {}",
            foreign,
            context.literals(),
            text
        );
    }

    /// Assert that a TallyResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &TallyResult<T>) {
        match result {
            Err(TallyError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
