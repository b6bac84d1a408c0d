//! End-to-end chat turns against the reference HQ dataset.

use std::sync::Arc;
use std::time::Duration;
use tally_assistant::{AnswerSource, Assistant, FallbackReason, MemorySink, TranscriptForwarder};
use tally_context::KeywordKnowledgeBase;
use tally_core::{AssistantConfig, Author, BackendFailure, Category, LlmError, Role};
use tally_llm::MockBackend;
use tally_test_utils::assertions::assert_only_context_numbers;
use tally_test_utils::fixtures::{self, HQ_ORDERS, HQ_REVENUE};
use tally_test_utils::{ScriptStep, ScriptedBackend};

fn assistant() -> Assistant {
    Assistant::new(
        AssistantConfig::default(),
        Arc::new(fixtures::hq_provider()),
        fixtures::manual_clock(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_accepts_answer_with_context_figures() {
    let backend = Arc::new(ScriptedBackend::replies([format!(
        "Total revenue is {} across {} orders.",
        HQ_REVENUE, HQ_ORDERS
    )]));
    let assistant = assistant().with_backend(backend.clone());

    let reply = assistant.chat("s1", "What was total revenue?", &Role::Hq).await;

    assert_eq!(reply.source, AnswerSource::Backend);
    assert_eq!(reply.category, Category::Analytics);
    assert_eq!(reply.answer, "Total revenue is $50,211,527.85 across 2,046,713 orders.");

    let prompt = &backend.prompts()[0];
    assert!(prompt.contains("- Total revenue: $50,211,527.85"));
    assert!(prompt.contains("- Total orders: 2,046,713"));
}

#[tokio::test]
async fn test_rejects_invented_figure_and_falls_back() {
    let backend = Arc::new(ScriptedBackend::replies(["Revenue is $52,000,000.00."]));
    let assistant = assistant().with_backend(backend);

    let reply = assistant.chat("s1", "What was total revenue?", &Role::Hq).await;

    match &reply.source {
        AnswerSource::Fallback(FallbackReason::ValidationRejected { tokens }) => {
            assert_eq!(tokens.iter().collect::<Vec<_>>(), vec!["52000000.00"]);
        }
        other => panic!("expected validation fallback, got {:?}", other),
    }
    assert!(!reply.answer.contains("52,000,000"));
    assert!(reply.answer.contains(HQ_REVENUE));
    assert_only_context_numbers(&reply.answer, &fixtures::hq_context(Category::Analytics));
}

#[tokio::test]
async fn test_backend_failure_falls_back_with_context_numbers() {
    let backend = Arc::new(ScriptedBackend::new([ScriptStep::Fail(LlmError::RateLimited {
        provider: "scripted".to_string(),
        retry_after_ms: 1000,
    })]));
    let assistant = assistant().with_backend(backend);

    let reply = assistant.chat("s1", "Anything new?", &Role::Hq).await;

    assert!(matches!(
        reply.source,
        AnswerSource::Fallback(FallbackReason::BackendFailed(BackendFailure::Unavailable { .. }))
    ));
    assert_only_context_numbers(&reply.answer, &fixtures::hq_context(Category::General));
}

#[tokio::test(start_paused = true)]
async fn test_backend_timeout_falls_back() {
    let config = AssistantConfig {
        backend_timeout_secs: 2,
        ..AssistantConfig::default()
    };
    let assistant = Assistant::new(config, Arc::new(fixtures::hq_provider()), fixtures::manual_clock())
        .unwrap()
        .with_backend(Arc::new(MockBackend::delayed(Duration::from_secs(10), "too late")));

    let reply = assistant.chat("s1", "How are sales?", &Role::Hq).await;

    assert_eq!(
        reply.source,
        AnswerSource::Fallback(FallbackReason::BackendFailed(BackendFailure::Timeout {
            after_ms: 2000
        }))
    );
    assert!(reply.answer.contains(HQ_REVENUE));
}

#[tokio::test]
async fn test_boilerplate_only_reply_is_malformed() {
    let assistant = assistant().with_backend(Arc::new(MockBackend::replying("Sure! Answer:")));
    let reply = assistant.chat("s1", "hello", &Role::Hq).await;
    assert!(matches!(
        reply.source,
        AnswerSource::Fallback(FallbackReason::BackendFailed(
            BackendFailure::MalformedResponse { .. }
        ))
    ));
    assert_eq!(reply.category, Category::Greeting);
}

#[tokio::test]
async fn test_unscoped_role_gets_no_figures_message() {
    let reply = assistant()
        .chat("s1", "How are sales?", &Role::Store("9999".to_string()))
        .await;
    assert_eq!(reply.source, AnswerSource::Fallback(FallbackReason::NoBackend));
    assert!(reply.answer.contains("verified figures"));
    assert!(tally_core::numeric::scan(&reply.answer).is_empty());
}

#[tokio::test]
async fn test_history_feeds_next_prompt() {
    let backend = Arc::new(ScriptedBackend::replies(["Revenue looks steady.", "Orders too."]));
    let assistant = assistant().with_backend(backend.clone());

    let first = assistant.chat("", "Tell me about revenue", &Role::Hq).await;
    let second = assistant.chat(&first.session_id, "And orders?", &Role::Hq).await;
    assert_eq!(first.session_id, second.session_id);

    let prompts = backend.prompts();
    assert!(!prompts[0].contains("Conversation so far:"));
    assert!(prompts[1].contains("User: Tell me about revenue"));
    assert!(prompts[1].contains("Assistant: Revenue looks steady."));

    let history = assistant.history(&first.session_id);
    let authors: Vec<Author> = history.iter().map(|e| e.author).collect();
    assert_eq!(
        authors,
        vec![Author::User, Author::Assistant, Author::User, Author::Assistant]
    );
}

#[tokio::test]
async fn test_support_question_gets_reference_notes() {
    let backend = Arc::new(ScriptedBackend::replies(["Use the Export button."]));
    let assistant = assistant()
        .with_backend(backend.clone())
        .with_knowledge(Arc::new(KeywordKnowledgeBase::builtin()));

    let reply = assistant.chat("s1", "How do I export a CSV?", &Role::Hq).await;

    assert_eq!(reply.category, Category::Support);
    assert_eq!(reply.source, AnswerSource::Backend);
    assert!(backend.prompts()[0].contains("Reference notes:"));
}

#[tokio::test]
async fn test_exchanges_are_forwarded_to_transcript() {
    let sink = Arc::new(MemorySink::new());
    let (forwarder, handle) = TranscriptForwarder::spawn(sink.clone(), 16);
    let assistant = assistant().with_transcript(forwarder);

    let reply = assistant.chat("s1", "hello", &Role::Hq).await;
    drop(assistant);

    let report = handle.await.unwrap();
    assert_eq!(report.delivered, 2);
    let recorded = sink.exchanges().await;
    assert_eq!(recorded[0].text, "hello");
    assert_eq!(recorded[1].text, reply.answer);
}

#[tokio::test]
async fn test_insights_reuse_context_displays() {
    let assistant = assistant();
    let insights = assistant.insights(&Role::Hq);
    assert!(insights.iter().any(|i| i.title == "Revenue is growing"));

    let ctx = fixtures::hq_context(Category::Analytics);
    for insight in &insights {
        assert_only_context_numbers(&insight.detail, &ctx);
    }
}
