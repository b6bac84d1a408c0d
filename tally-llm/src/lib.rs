//! TALLY LLM - Generative Backend Seam
//!
//! [`GenerativeBackend`] is the collaborator that turns a prompt into text.
//! [`BackendAdapter`] wraps one with a timeout, maps every error to a
//! [`BackendFailure`], and strips filler the model tends to put in front of
//! its answer. Concrete HTTP backends live in [`providers`].

pub mod providers;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tally_core::{AssistantConfig, BackendFailure, LlmError, TallyError, TallyResult};
use tracing::{debug, warn};

pub use providers::{AnthropicBackend, OpenAIBackend};

// ============================================================================
// GENERATIVE BACKEND TRAIT
// ============================================================================

/// Anything that can complete a prompt.
///
/// Implementations must be thread-safe and must not retry internally; the
/// caller decides what to do with a failure.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Complete `prompt`.
    ///
    /// # Returns
    /// * `Ok(String)` - Raw generated text
    /// * `Err(TallyError::Llm)` - Transport, status, rate-limit or parse failure
    async fn generate(&self, prompt: &str) -> TallyResult<String>;

    /// Name used in logs.
    fn backend_name(&self) -> &str;
}

// ============================================================================
// BOILERPLATE TRIMMING
// ============================================================================

const BOILERPLATE_PREFIXES: &[&str] = &[
    "here is the answer:",
    "here's the answer:",
    "assistant:",
    "answer:",
    "response:",
    "certainly!",
    "certainly,",
    "of course!",
    "of course,",
    "sure!",
    "sure,",
];

/// Strip known filler prefixes (case-insensitive, repeatedly) and surrounding whitespace.
pub fn trim_boilerplate(text: &str) -> String {
    let mut rest = text.trim();
    loop {
        let current: &str = rest;
        let stripped = BOILERPLATE_PREFIXES.iter().find_map(|prefix| {
            current
                .get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| current[prefix.len()..].trim_start())
        });
        match stripped {
            Some(next) => rest = next,
            None => break,
        }
    }
    rest.trim_end().to_string()
}

// ============================================================================
// BACKEND ADAPTER
// ============================================================================

/// Timeout-bounded, failure-normalizing wrapper around a [`GenerativeBackend`].
///
/// Dropping the future returned by [`generate`](Self::generate) cancels the
/// in-flight request.
#[derive(Clone)]
pub struct BackendAdapter {
    backend: Arc<dyn GenerativeBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for BackendAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendAdapter")
            .field("backend", &self.backend.backend_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn to_failure(err: TallyError) -> BackendFailure {
    match err {
        TallyError::Llm(e) => BackendFailure::from(e),
        TallyError::Backend(f) => f,
        other => BackendFailure::Unavailable {
            reason: other.to_string(),
        },
    }
}

impl BackendAdapter {
    pub fn new(backend: Arc<dyn GenerativeBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn from_config(backend: Arc<dyn GenerativeBackend>, config: &AssistantConfig) -> Self {
        Self::new(backend, config.backend_timeout())
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate text for `prompt`. Never retries.
    pub async fn generate(&self, prompt: &str) -> Result<String, BackendFailure> {
        let started = Instant::now();
        let raw = match tokio::time::timeout(self.timeout, self.backend.generate(prompt)).await {
            Err(_) => {
                let failure = BackendFailure::Timeout {
                    after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                };
                warn!(backend = self.backend_name(), kind = failure.kind(), "{}", failure);
                return Err(failure);
            }
            Ok(Err(e)) => {
                let failure = to_failure(e);
                warn!(backend = self.backend_name(), kind = failure.kind(), "{}", failure);
                return Err(failure);
            }
            Ok(Ok(text)) => text,
        };

        let cleaned = trim_boilerplate(&raw);
        if cleaned.is_empty() {
            let failure = BackendFailure::MalformedResponse {
                reason: "empty text after trimming".to_string(),
            };
            warn!(backend = self.backend_name(), kind = failure.kind(), "{}", failure);
            return Err(failure);
        }

        debug!(
            backend = self.backend_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = cleaned.len(),
            "Generative backend answered"
        );
        Ok(cleaned)
    }
}

// ============================================================================
// MOCK BACKEND (for testing)
// ============================================================================

/// What a [`MockBackend`] does when called.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Reply(String),
    Fail(LlmError),
    /// Sleep on the tokio clock, then reply.
    Delay { delay: Duration, reply: String },
}

/// Backend with a fixed behavior that records the prompts it sees.
#[derive(Debug)]
pub struct MockBackend {
    behavior: RwLock<MockBehavior>,
    calls: AtomicUsize,
    prompts: RwLock<Vec<String>>,
}

impl MockBackend {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: RwLock::new(behavior),
            calls: AtomicUsize::new(0),
            prompts: RwLock::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Reply(text.into()))
    }

    pub fn failing(error: LlmError) -> Self {
        Self::new(MockBehavior::Fail(error))
    }

    pub fn delayed(delay: Duration, reply: impl Into<String>) -> Self {
        Self::new(MockBehavior::Delay {
            delay,
            reply: reply.into(),
        })
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        let mut guard = self.behavior.write().unwrap_or_else(|e| e.into_inner());
        *guard = behavior;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate(&self, prompt: &str) -> TallyResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let behavior = self
            .behavior
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match behavior {
            MockBehavior::Reply(text) => Ok(text),
            MockBehavior::Fail(err) => Err(TallyError::Llm(err)),
            MockBehavior::Delay { delay, reply } => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
        }
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(backend: MockBackend) -> (Arc<MockBackend>, BackendAdapter) {
        let backend = Arc::new(backend);
        let adapter = BackendAdapter::new(backend.clone(), Duration::from_secs(30));
        (backend, adapter)
    }

    #[test]
    fn test_trim_boilerplate() {
        assert_eq!(trim_boilerplate("  Sure! Revenue is up.  "), "Revenue is up.");
        assert_eq!(
            trim_boilerplate("Certainly! Here is the answer: ANSWER: Orders fell."),
            "Orders fell."
        );
        assert_eq!(trim_boilerplate("assistant:\n\nHello"), "Hello");
        assert_eq!(trim_boilerplate("Surely not"), "Surely not");
        assert_eq!(trim_boilerplate("Sure!"), "");
        assert_eq!(trim_boilerplate("é answer"), "é answer");
    }

    #[tokio::test]
    async fn test_adapter_success_trims() {
        let (backend, adapter) = adapter(MockBackend::replying("Answer: Revenue was $10.00."));
        let text = adapter.generate("prompt").await.unwrap();
        assert_eq!(text, "Revenue was $10.00.");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.last_prompt().as_deref(), Some("prompt"));
    }

    #[tokio::test]
    async fn test_adapter_maps_llm_errors() {
        let (_, adapter) = adapter(MockBackend::failing(LlmError::RateLimited {
            provider: "openai".into(),
            retry_after_ms: 100,
        }));
        let failure = adapter.generate("p").await.unwrap_err();
        assert!(matches!(failure, BackendFailure::Unavailable { .. }));

        let (_, adapter) = self::adapter(MockBackend::failing(LlmError::EmptyResponse {
            provider: "anthropic".into(),
        }));
        let failure = adapter.generate("p").await.unwrap_err();
        assert!(matches!(failure, BackendFailure::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_adapter_empty_after_trim_is_malformed() {
        let (_, adapter) = adapter(MockBackend::replying("  Sure!  "));
        let failure = adapter.generate("p").await.unwrap_err();
        assert_eq!(failure.kind(), "malformed_response");
    }

    #[tokio::test(start_paused = true)]
    async fn test_adapter_times_out() {
        let (backend, adapter) =
            adapter(MockBackend::delayed(Duration::from_secs(60), "too late"));
        let failure = adapter.generate("p").await.unwrap_err();
        assert_eq!(failure, BackendFailure::Timeout { after_ms: 30_000 });
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adapter_within_timeout() {
        let (_, adapter) = adapter(MockBackend::delayed(Duration::from_secs(5), "in time"));
        assert_eq!(adapter.generate("p").await.unwrap(), "in time");
    }

    #[tokio::test]
    async fn test_mock_set_behavior() {
        let (backend, adapter) = adapter(MockBackend::replying("one"));
        backend.set_behavior(MockBehavior::Reply("two".into()));
        assert_eq!(adapter.generate("p").await.unwrap(), "two");
    }

    #[test]
    fn test_adapter_debug_names_backend() {
        let (_, adapter) = adapter(MockBackend::replying("x"));
        let debug = format!("{:?}", adapter);
        assert!(debug.contains("mock"));
        assert_eq!(adapter.timeout(), Duration::from_secs(30));
    }
}
