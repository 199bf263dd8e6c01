//! Start node: classifies the raw input as stop, clarification answer or new request.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::context::StageContext;
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::state::{TurnState, Utterance};

pub(crate) struct StartNode {
    ctx: Arc<StageContext>,
}

impl StartNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<TurnState> for StartNode {
    fn id(&self) -> &str {
        node_ids::START
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let input = state.input.trim().to_string();
        if input.is_empty() || self.ctx.config.is_stop_word(&input) {
            state.cancel_requested = true;
        } else if let Some(pending) = state.conversation.clarification.as_mut() {
            pending.exchange.push(Utterance::user(input));
            state.resumed = true;
        } else {
            state.conversation.turns.push(Utterance::user(input));
        }
        Ok((state, Next::Continue))
    }
}
