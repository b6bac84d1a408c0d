//! Anthropic generative backend

use super::client::AnthropicClient;
use super::types::{ContentBlock, Message, MessageRequest, MessageResponse};
use crate::providers::empty_response;
use crate::GenerativeBackend;
use async_trait::async_trait;
use tally_core::TallyResult;

/// Messages-API backend.
pub struct AnthropicBackend {
    client: AnthropicClient,
    model: String,
    max_tokens: i32,
    temperature: f32,
}

impl AnthropicBackend {
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-haiku-latest";

    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `model` - Model name
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(AnthropicClient::new(api_key, 50), model)
    }

    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, Self::DEFAULT_MODEL)
    }

    pub fn with_client(client: AnthropicClient, model: impl Into<String>) -> Self {
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

    pub(crate) fn request_for(&self, prompt: &str) -> MessageRequest {
        MessageRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            system: None,
            temperature: Some(self.temperature),
        }
    }
}

/// Concatenate the text blocks of a response.
pub(crate) fn extract_text(response: MessageResponse) -> TallyResult<String> {
    let text = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        Err(empty_response("anthropic"))
    } else {
        Ok(text)
    }
}

#[async_trait]
impl GenerativeBackend for AnthropicBackend {
    async fn generate(&self, prompt: &str) -> TallyResult<String> {
        let request = self.request_for(prompt);
        let response: MessageResponse = self.client.request("messages", &request).await?;
        extract_text(response)
    }

    fn backend_name(&self) -> &str {
        "anthropic"
    }
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("client", &self.client)
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{LlmError, TallyError};

    #[test]
    fn test_request_shape() {
        let backend = AnthropicBackend::with_default_model("k").with_max_tokens(256);
        let request = backend.request_for("Summarize CA");
        assert_eq!(request.model, AnthropicBackend::DEFAULT_MODEL);
        assert_eq!(request.max_tokens, 256);
        assert_eq!(request.messages[0].content, "Summarize CA");
    }

    #[test]
    fn test_extract_text_joins_blocks() {
        let response: MessageResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Revenue "},{"type":"tool_use","id":"x"},{"type":"text","text":"is flat."}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Revenue is flat.");
    }

    #[test]
    fn test_extract_text_empty() {
        let response: MessageResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(TallyError::Llm(LlmError::EmptyResponse { .. }))
        ));
    }
}
