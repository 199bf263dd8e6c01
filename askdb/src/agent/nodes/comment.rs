//! Comment node: explains the final statement and finishes the answer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::context::StageContext;
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::message::Message;
use crate::output::TurnOutput;
use crate::prompts::Prompts;
use crate::state::TurnState;

pub(crate) struct CommentNode {
    ctx: Arc<StageContext>,
}

impl CommentNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }

    async fn explain(&self, state: &TurnState, sql: &str) -> String {
        let config = &self.ctx.config;
        let prompts = &config.prompts;
        let conversation = &state.conversation;
        let instruction = conversation.pending_instruction.as_deref().unwrap_or_default();
        let restriction = if conversation.restriction_applied {
            &prompts.restricted_note
        } else {
            &prompts.unrestricted_note
        };
        let system = Prompts::render(
            &prompts.comment,
            &[
                ("instruction", instruction),
                ("sql", sql),
                ("restriction", restriction.as_str()),
            ],
        );
        match self
            .ctx
            .ask(
                node_ids::COMMENT,
                config.timeouts.comment,
                &system,
                &[Message::user(instruction)],
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => prompts.comment_unavailable.clone(),
        }
    }
}

#[async_trait]
impl Node<TurnState> for CommentNode {
    fn id(&self) -> &str {
        node_ids::COMMENT
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let final_sql = state.conversation.final_sql.clone();
        let explanation = match &final_sql {
            Some(sql) => self.explain(&state, sql).await,
            None => self.ctx.config.prompts.generation_failed.clone(),
        };
        let applied = state.conversation.restriction_applied;
        state.finish(TurnOutput::answer(final_sql, explanation, applied));
        Ok((state, Next::End))
    }
}
