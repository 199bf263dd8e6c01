//! OpenAI Chat Completions client implementing `LlmClient` (ChatOpenAI).
//!
//! Works with any OpenAI-compatible endpoint (`OPENAI_BASE_URL`). Requires
//! `OPENAI_API_KEY` or an explicit config. Temperature is usually pinned to its
//! minimum so validation and SQL drafting stay reproducible.

use async_trait::async_trait;
use tracing::{debug, trace};

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
    Client,
};

use crate::llm::{LlmClient, LlmError, LlmResponse, LlmUsage};
use crate::message::Message;

/// OpenAI Chat Completions client.
///
/// **Interaction**: Implements `LlmClient`; shared by every dialogue stage.
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
}

impl ChatOpenAI {
    /// Build client with default config (API key from `OPENAI_API_KEY` env).
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            temperature: None,
        }
    }

    /// Build client with custom config (e.g. custom API key or base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: None,
        }
    }

    /// Set temperature (0–2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Convert our `Message` list to OpenAI request messages.
    fn messages_to_request(messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System(s) => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(s.as_str()),
                ),
                Message::User(s) => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(s.as_str()),
                ),
                Message::Assistant(s) => {
                    ChatCompletionRequestMessage::Assistant((s.as_str()).into())
                }
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError> {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages));
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        let request = args
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        debug!(
            trace_id = %trace_id,
            model = %self.model,
            message_count = messages.len(),
            temperature = ?self.temperature,
            "OpenAI chat create"
        );
        if let Ok(js) = serde_json::to_string_pretty(&request) {
            trace!(trace_id = %trace_id, request = %js, "OpenAI request body");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let usage = response.usage.as_ref().map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;
        let content = choice.message.content.unwrap_or_default();
        trace!(trace_id = %trace_id, content = %content, "OpenAI response content");

        Ok(LlmResponse { content, usage })
    }
}
