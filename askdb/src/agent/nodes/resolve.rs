//! Resolve node: filter phrases of the instruction mapped to reference entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::agent::context::{bounded, StageContext};
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::message::Message;
use crate::state::TurnState;

pub(crate) struct ResolveNode {
    ctx: Arc<StageContext>,
}

impl ResolveNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }
}

/// Comma or newline separated phrases, trimmed of whitespace, quotes and list
/// bullets, de-duplicated in first-seen order. `none` means no phrases.
pub(crate) fn parse_phrases(reply: &str) -> Vec<String> {
    let mut phrases: Vec<String> = Vec::new();
    for raw in reply.split(|c| c == ',' || c == '\n') {
        let phrase = raw
            .trim()
            .trim_start_matches(|c| c == '-' || c == '*')
            .trim()
            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
            .trim();
        if phrase.is_empty() || phrase.eq_ignore_ascii_case("none") {
            continue;
        }
        if !phrases.iter().any(|p| p == phrase) {
            phrases.push(phrase.to_string());
        }
    }
    phrases
}

#[async_trait]
impl Node<TurnState> for ResolveNode {
    fn id(&self) -> &str {
        node_ids::RESOLVE
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let config = &self.ctx.config;
        let instruction = state
            .conversation
            .pending_instruction
            .clone()
            .ok_or_else(|| AgentError::ExecutionFailed("resolve without instruction".into()))?;

        // Extraction and lookup share one deadline.
        let deadline = Instant::now() + config.timeouts.resolve;
        let phrases = match self
            .ctx
            .ask(
                node_ids::RESOLVE,
                config.timeouts.resolve,
                &config.prompts.extract_filters,
                &[Message::user(instruction)],
            )
            .await
        {
            Ok(reply) => parse_phrases(&reply),
            Err(_) => Vec::new(),
        };

        let filters = if phrases.is_empty() {
            BTreeMap::new()
        } else {
            bounded(
                node_ids::RESOLVE,
                deadline.saturating_duration_since(Instant::now()),
                self.ctx.resolver.resolve(&phrases),
            )
            .await
            .unwrap_or_default()
        };
        tracing::debug!(phrases = phrases.len(), resolved = filters.len(), "filters resolved");
        state.conversation.resolved_filters = filters;
        Ok((state, Next::Continue))
    }
}
