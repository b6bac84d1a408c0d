//! HTTP generative backends.
//!
//! Each provider has a rate-limited client, wire types and a
//! [`GenerativeBackend`](crate::GenerativeBackend) implementation.

pub mod anthropic;
pub mod openai;

pub use anthropic::{AnthropicBackend, AnthropicClient};
pub use openai::{OpenAIBackend, OpenAIClient};

use crate::GenerativeBackend;
use std::sync::Arc;
use tally_core::{LlmError, TallyError};
use tracing::info;

pub(crate) fn request_failed(provider: &str, status: i32, message: impl Into<String>) -> TallyError {
    TallyError::Llm(LlmError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> TallyError {
    TallyError::Llm(LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> TallyError {
    TallyError::Llm(LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}

pub(crate) fn empty_response(provider: &str) -> TallyError {
    TallyError::Llm(LlmError::EmptyResponse {
        provider: provider.to_string(),
    })
}

/// `Retry-After` in seconds (integer or fractional) as milliseconds.
pub(crate) fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<i64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(|seconds| (seconds * 1000.0) as i64)
}

/// Pick a backend from environment variables.
///
/// - `OPENAI_API_KEY` selects OpenAI (model from `TALLY_OPENAI_MODEL`, default `gpt-4o-mini`)
/// - otherwise `ANTHROPIC_API_KEY` selects Anthropic (model from `TALLY_ANTHROPIC_MODEL`)
///
/// Returns `None` when neither key is set; the assistant then answers from
/// its deterministic templates only.
pub fn backend_from_env() -> Option<Arc<dyn GenerativeBackend>> {
    let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("OPENAI_API_KEY") {
        let model = non_empty("TALLY_OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        info!(backend = "openai", model = %model, "Configured generative backend");
        return Some(Arc::new(OpenAIBackend::new(key, model)));
    }

    if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
        let model = non_empty("TALLY_ANTHROPIC_MODEL")
            .unwrap_or_else(|| AnthropicBackend::DEFAULT_MODEL.to_string());
        info!(backend = "anthropic", model = %model, "Configured generative backend");
        return Some(Arc::new(AnthropicBackend::new(key, model)));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after_ms(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(parse_retry_after_ms(&headers), Some(2000));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("0.5"));
        assert_eq!(parse_retry_after_ms(&headers), Some(500));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after_ms(&headers), None);
    }

    #[test]
    fn test_error_helpers() {
        assert!(matches!(
            request_failed("openai", 500, "boom"),
            TallyError::Llm(LlmError::RequestFailed { status: 500, .. })
        ));
        assert!(matches!(
            rate_limited("openai", 10),
            TallyError::Llm(LlmError::RateLimited { retry_after_ms: 10, .. })
        ));
        assert!(matches!(
            invalid_response("anthropic", "bad json"),
            TallyError::Llm(LlmError::InvalidResponse { .. })
        ));
        assert!(matches!(
            empty_response("anthropic"),
            TallyError::Llm(LlmError::EmptyResponse { .. })
        ));
    }
}
