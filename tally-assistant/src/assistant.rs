//! Chat-turn orchestration.
//!
//! A turn moves through a fixed set of states:
//!
//! ```text
//! Categorize -> ContextReady -> Prompted -> BackendResult -> Validated -> Responded
//!                    |                            |              |
//!                    +-------- Fallback <---------+--------------+
//! ```
//!
//! `Fallback` is entered when no backend is configured, when the backend
//! fails, or when the generated answer mentions a figure that is not in the
//! verified context. Every path ends at `Responded`, so [`Assistant::chat`]
//! always produces an answer.

use crate::categorize::Categorizer;
use crate::fallback::FallbackComposer;
use crate::insights::InsightEngine;
use crate::transcript::TranscriptForwarder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tally_context::{KnowledgeRetriever, PromptBuilder};
use tally_core::{
    new_session_id, AssistantConfig, BackendFailure, BusinessContext, Category, ChatExchange,
    Clock, Insight, Role, ScopeKey, TallyResult,
};
use tally_guard::NumericValidator;
use tally_llm::{BackendAdapter, GenerativeBackend};
use tally_metrics::{BusinessContextBuilder, MetricsProvider};
use tally_storage::{CacheStats, ContextCache, HistoryRing};
use tracing::{debug, info, warn};

// ============================================================================
// REPLY TYPES
// ============================================================================

/// Why a turn was answered by the fallback composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No generative backend is configured.
    NoBackend,
    /// The backend timed out, was unreachable, or returned nothing usable.
    BackendFailed(BackendFailure),
    /// The generated answer contained figures not in the context.
    ValidationRejected { tokens: BTreeSet<String> },
}

/// Where the final answer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSource {
    Backend,
    Fallback(FallbackReason),
}

impl AnswerSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Fallback(_) => "fallback",
        }
    }
}

impl Serialize for AnswerSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Answer to one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub session_id: String,
    pub category: Category,
    pub source: AnswerSource,
}

// ============================================================================
// TURN STATE MACHINE
// ============================================================================

enum TurnState {
    Categorize,
    ContextReady {
        category: Category,
        context: Arc<BusinessContext>,
    },
    Prompted {
        category: Category,
        context: Arc<BusinessContext>,
        adapter: BackendAdapter,
        prompt: String,
    },
    BackendResult {
        category: Category,
        context: Arc<BusinessContext>,
        result: Result<String, BackendFailure>,
    },
    Validated {
        category: Category,
        answer: String,
    },
    Fallback {
        category: Category,
        context: Arc<BusinessContext>,
        reason: FallbackReason,
    },
    Responded {
        category: Category,
        answer: String,
        source: AnswerSource,
    },
}

impl TurnState {
    fn name(&self) -> &'static str {
        match self {
            Self::Categorize => "categorize",
            Self::ContextReady { .. } => "context_ready",
            Self::Prompted { .. } => "prompted",
            Self::BackendResult { .. } => "backend_result",
            Self::Validated { .. } => "validated",
            Self::Fallback { .. } => "fallback",
            Self::Responded { .. } => "responded",
        }
    }
}

// ============================================================================
// ASSISTANT
// ============================================================================

/// The business-context assistant: chat, history and insights.
pub struct Assistant {
    config: AssistantConfig,
    clock: Arc<dyn Clock>,
    builder: BusinessContextBuilder,
    cache: ContextCache,
    history: HistoryRing,
    categorizer: Categorizer,
    prompts: PromptBuilder,
    backend: Option<BackendAdapter>,
    validator: NumericValidator,
    fallback: FallbackComposer,
    insights: InsightEngine,
    knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    transcript: Option<TranscriptForwarder>,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("config", &self.config)
            .field("builder", &self.builder)
            .field("backend", &self.backend)
            .field("has_knowledge", &self.knowledge.is_some())
            .field("has_transcript", &self.transcript.is_some())
            .finish()
    }
}

impl Assistant {
    /// Create an assistant without a generative backend. Validates `config`.
    pub fn new(
        config: AssistantConfig,
        provider: Arc<dyn MetricsProvider>,
        clock: Arc<dyn Clock>,
    ) -> TallyResult<Self> {
        config.validate()?;
        let builder = BusinessContextBuilder::new(provider, clock.clone(), &config);
        let cache = ContextCache::from_config(&config, clock.clone());
        let history = HistoryRing::from_config(&config);

        info!(
            critical_ttl_secs = config.critical_ttl_secs,
            standard_ttl_secs = config.standard_ttl_secs,
            history_capacity = config.history_capacity,
            "Assistant initialized"
        );

        Ok(Self {
            prompts: PromptBuilder::from_config(&config),
            insights: InsightEngine::from_config(&config),
            config,
            clock,
            builder,
            cache,
            history,
            categorizer: Categorizer::new(),
            backend: None,
            validator: NumericValidator::new(),
            fallback: FallbackComposer::new(),
            knowledge: None,
            transcript: None,
        })
    }

    pub fn with_backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.backend = Some(BackendAdapter::from_config(backend, &self.config));
        self
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeRetriever>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_transcript(mut self, forwarder: TranscriptForwarder) -> Self {
        self.transcript = Some(forwarder);
        self
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Answer `query` for `role`. An empty `session_id` starts a new session.
    pub async fn chat(&self, session_id: &str, query: &str, role: &Role) -> ChatReply {
        let session_id = match session_id.trim() {
            "" => new_session_id(),
            id => id.to_string(),
        };
        let prior = self.history.window(&session_id, self.prompts.history_window());

        let mut state = TurnState::Categorize;
        let (category, answer, source) = loop {
            debug!(session_id = %session_id, state = state.name(), "Chat turn transition");
            state = match state {
                TurnState::Categorize => {
                    let category = self.categorizer.categorize(query);
                    let context = self.context_for(&ScopeKey::new(role.clone(), category));
                    TurnState::ContextReady { category, context }
                }
                TurnState::ContextReady { category, context } => match &self.backend {
                    None => TurnState::Fallback {
                        category,
                        context,
                        reason: FallbackReason::NoBackend,
                    },
                    Some(adapter) => {
                        let snippet = self.snippet_for(category, query);
                        let prompt = self.prompts.build(query, &context, &prior, snippet.as_deref());
                        TurnState::Prompted {
                            category,
                            context,
                            adapter: adapter.clone(),
                            prompt,
                        }
                    }
                },
                TurnState::Prompted {
                    category,
                    context,
                    adapter,
                    prompt,
                } => {
                    let result = adapter.generate(&prompt).await;
                    TurnState::BackendResult {
                        category,
                        context,
                        result,
                    }
                }
                TurnState::BackendResult {
                    category,
                    context,
                    result,
                } => match result {
                    Err(failure) => TurnState::Fallback {
                        category,
                        context,
                        reason: FallbackReason::BackendFailed(failure),
                    },
                    Ok(text) => {
                        let outcome = self.validator.validate(&text, &context);
                        if outcome.accepted {
                            TurnState::Validated {
                                category,
                                answer: text,
                            }
                        } else {
                            TurnState::Fallback {
                                category,
                                context,
                                reason: FallbackReason::ValidationRejected {
                                    tokens: outcome.rejected_tokens,
                                },
                            }
                        }
                    }
                },
                TurnState::Validated { category, answer } => TurnState::Responded {
                    category,
                    answer,
                    source: AnswerSource::Backend,
                },
                TurnState::Fallback {
                    category,
                    context,
                    reason,
                } => {
                    if reason != FallbackReason::NoBackend {
                        warn!(session_id = %session_id, reason = ?reason, "Answering from fallback");
                    }
                    TurnState::Responded {
                        category,
                        answer: self.fallback.compose(category, &context),
                        source: AnswerSource::Fallback(reason),
                    }
                }
                TurnState::Responded {
                    category,
                    answer,
                    source,
                } => break (category, answer, source),
            };
        };

        self.record(&session_id, query, &answer, category);
        info!(
            session_id = %session_id,
            role = %role,
            category = %category,
            source = source.as_str(),
            "Chat turn answered"
        );

        ChatReply {
            answer,
            session_id,
            category,
            source,
        }
    }

    /// Exchanges of `session_id`, oldest first.
    pub fn history(&self, session_id: &str) -> Vec<ChatExchange> {
        self.history.history(session_id)
    }

    /// Recommendations for `role`, from its analytics context.
    pub fn insights(&self, role: &Role) -> Vec<Insight> {
        let context = self.context_for(&ScopeKey::new(role.clone(), Category::Analytics));
        self.insights.derive(&context)
    }

    /// Drop cached contexts for `role` so the next lookup rebuilds.
    pub fn refresh(&self, role: &Role) -> usize {
        self.cache.invalidate_role(role)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forget sessions idle for longer than `max_idle`.
    pub fn prune_idle_sessions(&self, max_idle: chrono::Duration) -> usize {
        self.history.prune_idle(self.clock.now(), max_idle)
    }

    fn context_for(&self, key: &ScopeKey) -> Arc<BusinessContext> {
        let read = self.cache.get_or_build(key, |k| self.builder.build(k));
        debug!(
            scope = %key,
            cache_hit = read.was_cache_hit(),
            age_ms = read.staleness(self.clock.now()).as_millis() as u64,
            "Context ready"
        );
        read.into_value()
    }

    fn snippet_for(&self, category: Category, query: &str) -> Option<String> {
        if category.is_analytics() {
            return None;
        }
        self.knowledge.as_ref()?.find_snippet(query)
    }

    fn record(&self, session_id: &str, query: &str, answer: &str, category: Category) {
        let now = self.clock.now();
        let exchanges = [
            ChatExchange::user(session_id, query, category, now),
            ChatExchange::assistant(session_id, answer, category, now),
        ];
        for exchange in exchanges {
            if let Some(forwarder) = &self.transcript {
                // Full or closed queues are logged by the forwarder.
                let _ = forwarder.forward(exchange.clone());
            }
            self.history.append(session_id, exchange);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tally_core::{LlmError, ManualClock};
    use tally_llm::MockBackend;
    use tally_metrics::{AggregateKind, InMemoryMetricsProvider};

    fn provider() -> Arc<InMemoryMetricsProvider> {
        Arc::new(InMemoryMetricsProvider::new().with_records(
            Role::Hq,
            AggregateKind::Summary,
            vec![json!({"total_revenue": 50211527.85, "total_orders": 2046713, "location_count": 12})],
        ))
    }

    fn assistant() -> Assistant {
        Assistant::new(
            AssistantConfig::default(),
            provider(),
            Arc::new(ManualClock::at_epoch()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_no_backend_uses_fallback() {
        let reply = assistant().chat("s1", "What is going on?", &Role::Hq).await;
        assert_eq!(reply.source, AnswerSource::Fallback(FallbackReason::NoBackend));
        assert_eq!(reply.category, Category::General);
        assert!(reply.answer.contains("$50,211,527.85"));
    }

    #[tokio::test]
    async fn test_backend_answer_is_used_when_valid() {
        let backend = Arc::new(MockBackend::replying("Answer: Revenue was $50,211,527.85."));
        let assistant = assistant().with_backend(backend.clone());
        let reply = assistant.chat("s1", "What was revenue?", &Role::Hq).await;
        assert_eq!(reply.source, AnswerSource::Backend);
        assert_eq!(reply.answer, "Revenue was $50,211,527.85.");
        assert!(backend.last_prompt().unwrap().contains("Question: What was revenue?"));
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back() {
        let backend = Arc::new(MockBackend::failing(LlmError::RequestFailed {
            provider: "mock".to_string(),
            status: 503,
            message: "down".to_string(),
        }));
        let reply = assistant()
            .with_backend(backend)
            .chat("s1", "What was revenue?", &Role::Hq)
            .await;
        assert!(matches!(
            reply.source,
            AnswerSource::Fallback(FallbackReason::BackendFailed(BackendFailure::Unavailable { .. }))
        ));
        assert!(reply.answer.contains("$50,211,527.85"));
    }

    #[tokio::test]
    async fn test_empty_session_gets_new_id_and_history() {
        let assistant = assistant();
        let reply = assistant.chat("  ", "hello", &Role::Hq).await;
        assert!(!reply.session_id.trim().is_empty());

        let history = assistant.history(&reply.session_id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "hello");
        assert_eq!(history[1].text, reply.answer);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AssistantConfig {
            history_capacity: 0,
            ..AssistantConfig::default()
        };
        assert!(Assistant::new(config, provider(), Arc::new(ManualClock::at_epoch())).is_err());
    }

    #[test]
    fn test_answer_source_serializes_as_label() {
        let reply = ChatReply {
            answer: "a".to_string(),
            session_id: "s".to_string(),
            category: Category::General,
            source: AnswerSource::Fallback(FallbackReason::NoBackend),
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["source"], "fallback");
    }
}
