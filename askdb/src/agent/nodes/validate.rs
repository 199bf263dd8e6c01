//! Validate node: the clarification loop.
//!
//! A question suspends the turn; the exchange lives in
//! `ConversationState::clarification` until the loop reaches a terminal
//! outcome and is committed to `turns` in one piece.

use std::sync::Arc;

use async_trait::async_trait;

use super::to_messages;
use crate::agent::context::{date_vars, StageContext};
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::message::Message;
use crate::output::TurnOutput;
use crate::prompts::Prompts;
use crate::state::{ReplyKind, TurnState, Utterance, ValidationOutcome};

pub(crate) struct ValidateNode {
    ctx: Arc<StageContext>,
}

impl ValidateNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }

    fn messages(&self, state: &TurnState) -> Vec<Message> {
        let config = &self.ctx.config;
        let conversation = &state.conversation;
        let mut messages = config.seed_history.clone();
        messages.extend(to_messages(conversation.recent(config.validation_history)));
        if let Some(pending) = &conversation.clarification {
            messages.extend(to_messages(&pending.exchange));
        }
        messages
    }
}

#[async_trait]
impl Node<TurnState> for ValidateNode {
    fn id(&self) -> &str {
        node_ids::VALIDATE
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let config = &self.ctx.config;
        if !state.resumed {
            state.conversation.reset_request();
        }
        let (today, yesterday) = date_vars(state.today);
        let system = Prompts::render(
            &config.prompts.validate,
            &[
                ("schema", config.schema.as_str()),
                ("references", config.reference_catalogue.as_str()),
                ("today", today.as_str()),
                ("yesterday", yesterday.as_str()),
                ("marker", config.accepted_marker.as_str()),
            ],
        );
        let messages = self.messages(&state);
        let outcome = match self
            .ctx
            .ask(node_ids::VALIDATE, config.timeouts.validate, &system, &messages)
            .await
        {
            Ok(reply) => ValidationOutcome::parse(&reply, &config.accepted_marker),
            Err(reason) => ValidationOutcome::Failed { reason },
        };

        let conversation = &mut state.conversation;
        match &outcome {
            ValidationOutcome::NeedsClarification { question } => {
                let pending = conversation.clarification.get_or_insert_with(Default::default);
                pending.exchange.push(Utterance::assistant(question.clone()));
                pending.rounds += 1;
                tracing::info!(rounds = pending.rounds, "clarification requested");
                state.output = Some(TurnOutput::clarification(question.clone()));
            }
            ValidationOutcome::Accepted { instruction } => {
                conversation.commit_clarification();
                conversation.pending_instruction = Some(instruction.clone());
                tracing::info!("request validated");
            }
            ValidationOutcome::Failed { reason } => {
                conversation.commit_clarification();
                tracing::warn!(%reason, "validation failed");
                state.reply = Some(ReplyKind::ValidationFailed(reason.clone()));
            }
            ValidationOutcome::Cancelled => state.cancel_requested = true,
        }
        state.validation = Some(outcome);
        Ok((state, Next::Continue))
    }
}
