//! Relevance node: can the configured schema answer this at all.

use std::sync::Arc;

use async_trait::async_trait;

use super::classifier_messages;
use crate::agent::context::StageContext;
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::prompts::Prompts;
use crate::state::{Relevance, ReplyKind, TurnState};

pub(crate) struct RelevanceNode {
    ctx: Arc<StageContext>,
}

impl RelevanceNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<TurnState> for RelevanceNode {
    fn id(&self) -> &str {
        node_ids::RELEVANCE
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let config = &self.ctx.config;
        let system = Prompts::render(
            &config.prompts.relevance,
            &[("schema", config.schema.as_str())],
        );
        let messages = classifier_messages(&state, config.intent_history);
        let relevance = match self
            .ctx
            .ask(node_ids::RELEVANCE, config.timeouts.classify, &system, &messages)
            .await
        {
            Ok(label) => Relevance::parse(&label).unwrap_or(Relevance::InDomain),
            Err(_) => Relevance::InDomain,
        };
        if relevance == Relevance::OutOfDomain {
            state.reply = Some(ReplyKind::OutOfDomain);
        }
        state.relevance = Some(relevance);
        Ok((state, Next::Continue))
    }
}
