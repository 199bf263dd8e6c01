//! Reply node: every non-SQL ending except cancellation and clarification.

use std::sync::Arc;

use async_trait::async_trait;

use super::classifier_messages;
use crate::agent::context::StageContext;
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::output::TurnOutput;
use crate::state::{ReplyKind, TurnState};

pub(crate) struct ReplyNode {
    ctx: Arc<StageContext>,
}

impl ReplyNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<TurnState> for ReplyNode {
    fn id(&self) -> &str {
        node_ids::REPLY
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let config = &self.ctx.config;
        let prompts = &config.prompts;
        let text = match &state.reply {
            Some(ReplyKind::Greeting) | Some(ReplyKind::Chitchat) | None => {
                let messages = classifier_messages(&state, config.intent_history);
                match self
                    .ctx
                    .ask(
                        node_ids::REPLY,
                        config.timeouts.classify,
                        &prompts.small_talk,
                        &messages,
                    )
                    .await
                {
                    Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                    _ => prompts.greeting_fallback.clone(),
                }
            }
            Some(ReplyKind::OutOfDomain) => prompts.out_of_domain.clone(),
            Some(ReplyKind::ValidationFailed(_)) => prompts.validation_failed.clone(),
        };
        state.finish(TurnOutput::reply(text));
        Ok((state, Next::End))
    }
}
