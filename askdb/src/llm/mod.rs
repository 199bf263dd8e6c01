//! LLM client abstraction for the dialogue stages.
//!
//! Every stage that needs free text (intent, relevance, validation, filter
//! extraction, SQL drafting, explanation) goes through [`LlmClient`]. The
//! orchestrator treats it as an opaque completion function.

mod mock;
mod openai;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::Message;

/// Error from an LLM call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request could not be built.
    #[error("request build failed: {0}")]
    Request(String),
    /// The provider returned an error (network, auth, rate limit).
    #[error("api error: {0}")]
    Api(String),
    /// The provider answered without any choice.
    #[error("empty response")]
    EmptyResponse,
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM completion.
#[derive(Clone, Debug)]
pub struct LlmResponse {
    /// Assistant message content (plain text).
    pub content: String,
    /// Token usage for this call, when the provider reports it.
    pub usage: Option<LlmUsage>,
}

/// LLM client: given messages, returns assistant text.
///
/// Implementations: `MockLlm` (scripted, for tests), `ChatOpenAI` (any
/// OpenAI-compatible endpoint).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invoke one completion over the full message list.
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError>;

    /// Completion with a system prompt placed before `messages`; returns the text only.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
    ) -> Result<String, LlmError> {
        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(Message::system(system_prompt));
        all.extend_from_slice(messages);
        Ok(self.invoke(&all).await?.content)
    }
}
