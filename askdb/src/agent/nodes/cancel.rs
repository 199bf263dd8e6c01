//! Cancel node: ends the current request on a stop input.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::context::StageContext;
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::output::TurnOutput;
use crate::state::{TurnState, Utterance};

pub(crate) struct CancelNode {
    ctx: Arc<StageContext>,
}

impl CancelNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<TurnState> for CancelNode {
    fn id(&self) -> &str {
        node_ids::CANCEL
    }

    /// Commits the pending exchange followed by the stop input, then clears
    /// the request.
    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let conversation = &mut state.conversation;
        conversation.commit_clarification();
        let input = state.input.trim();
        if !input.is_empty() {
            conversation.turns.push(Utterance::user(input));
        }
        conversation.pending_instruction = None;
        conversation.clarification = None;
        tracing::info!(subject = %conversation.subject, "request cancelled");
        state.finish(TurnOutput::cancelled(self.ctx.config.prompts.cancelled.clone()));
        Ok((state, Next::End))
    }
}
