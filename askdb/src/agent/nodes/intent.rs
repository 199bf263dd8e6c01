//! Intent node: greeting, chitchat or database question.

use std::sync::Arc;

use async_trait::async_trait;

use super::classifier_messages;
use crate::agent::context::StageContext;
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::state::{Intent, ReplyKind, TurnState};

pub(crate) struct IntentNode {
    ctx: Arc<StageContext>,
}

impl IntentNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<TurnState> for IntentNode {
    fn id(&self) -> &str {
        node_ids::INTENT
    }

    /// Unknown labels and failures count as a database question.
    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let config = &self.ctx.config;
        let messages = classifier_messages(&state, config.intent_history);
        let label = self
            .ctx
            .ask(
                node_ids::INTENT,
                config.timeouts.classify,
                &config.prompts.intent,
                &messages,
            )
            .await;
        let intent = match label.as_deref().map(Intent::parse) {
            Ok(Some(intent)) => intent,
            Ok(None) => {
                tracing::warn!(label = ?label, "unknown intent label, treating as database question");
                Intent::DatabaseQuestion
            }
            Err(_) => Intent::DatabaseQuestion,
        };
        tracing::debug!(?intent, "intent classified");
        state.reply = match intent {
            Intent::Greeting => Some(ReplyKind::Greeting),
            Intent::Chitchat => Some(ReplyKind::Chitchat),
            Intent::DatabaseQuestion => None,
        };
        state.intent = Some(intent);
        Ok((state, Next::Continue))
    }
}
