//! OpenAI generative backend

use super::client::OpenAIClient;
use super::types::{CompletionRequest, CompletionResponse, Message};
use crate::providers::{empty_response, invalid_response};
use crate::GenerativeBackend;
use async_trait::async_trait;
use tally_core::TallyResult;

/// Chat-completions backend.
pub struct OpenAIBackend {
    client: OpenAIClient,
    model: String,
    max_tokens: i32,
    temperature: f32,
}

impl OpenAIBackend {
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4o-mini", "gpt-4o")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(OpenAIClient::new(api_key, 60), model)
    }

    pub fn with_client(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 400,
            temperature: 0.2,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub(crate) fn request_for(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        }
    }
}

pub(crate) fn extract_text(response: CompletionResponse) -> TallyResult<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| invalid_response("openai", "No completion in response"))?;
    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(empty_response("openai")),
    }
}

#[async_trait]
impl GenerativeBackend for OpenAIBackend {
    async fn generate(&self, prompt: &str) -> TallyResult<String> {
        let request = self.request_for(prompt);
        let response: CompletionResponse = self.client.request("chat/completions", &request).await?;
        extract_text(response)
    }

    fn backend_name(&self) -> &str {
        "openai"
    }
}

impl std::fmt::Debug for OpenAIBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIBackend")
            .field("client", &self.client)
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{LlmError, TallyError};

    fn response(raw: &str) -> CompletionResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_request_carries_prompt_as_user_message() {
        let backend = OpenAIBackend::new("k", "gpt-4o-mini").with_temperature(0.0);
        let request = backend.request_for("How are sales?");
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content.as_deref(), Some("How are sales?"));
        assert_eq!(request.temperature, Some(0.0));
    }

    #[test]
    fn test_extract_text() {
        let ok = response(r#"{"choices":[{"message":{"role":"assistant","content":"Up 4%"}}]}"#);
        assert_eq!(extract_text(ok).unwrap(), "Up 4%");

        let none = response(r#"{"choices":[]}"#);
        assert!(matches!(
            extract_text(none),
            Err(TallyError::Llm(LlmError::InvalidResponse { .. }))
        ));

        let blank = response(r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#);
        assert!(matches!(
            extract_text(blank),
            Err(TallyError::Llm(LlmError::EmptyResponse { .. }))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let backend = OpenAIBackend::new("sk-live-123", "gpt-4o");
        assert!(!format!("{:?}", backend).contains("sk-live-123"));
        assert_eq!(backend.backend_name(), "openai");
    }
}
