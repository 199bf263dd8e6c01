//! Mock LLM for tests.
//!
//! Replies come from a script (one entry per call, in order) or from a
//! handler closure that sees the request. Every request is recorded so tests
//! can assert on prompts.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, LlmResponse};
use crate::message::Message;

type Handler = Box<dyn Fn(&[Message]) -> Result<String, LlmError> + Send + Sync>;

enum Source {
    Script(Mutex<VecDeque<Result<String, LlmError>>>),
    Handler(Handler),
}

/// Mock LLM: scripted replies or a request handler.
///
/// When the script runs out, further calls fail with `LlmError::Api`, which
/// the dialogue stages treat like any collaborator failure.
///
/// **Interaction**: Implements `LlmClient`; used by orchestrator tests.
pub struct MockLlm {
    source: Source,
    delay: Option<Duration>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlm {
    /// Replies with the given texts, one per call, in order.
    pub fn scripted<I, T>(replies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// Like `scripted`, but entries may be errors.
    pub fn from_results<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, LlmError>>,
    {
        Self {
            source: Source::Script(Mutex::new(replies.into_iter().collect())),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies by calling `handler` with the full request.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&[Message]) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            source: Source::Handler(Box::new(handler)),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps before every reply (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let content = match &self.source {
            Source::Script(queue) => queue
                .lock()
                .map_err(|_| LlmError::Api("mock script poisoned".into()))?
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Api("mock script exhausted".into())))?,
            Source::Handler(handler) => handler(messages)?,
        };
        Ok(LlmResponse {
            content,
            usage: None,
        })
    }
}
