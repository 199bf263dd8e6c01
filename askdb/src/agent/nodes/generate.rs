//! Generate node: drafts the SQL statement.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::context::{date_vars, StageContext};
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::message::Message;
use crate::prompts::Prompts;
use crate::state::{GenerationOutcome, TurnState};

pub(crate) struct GenerateSqlNode {
    ctx: Arc<StageContext>,
}

impl GenerateSqlNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }
}

fn filters_text(state: &TurnState) -> String {
    let filters = &state.conversation.resolved_filters;
    if filters.is_empty() {
        return "none".to_string();
    }
    filters
        .iter()
        .map(|(phrase, e)| format!("{} -> {}.{} ({})", phrase, e.table, e.key, e.label))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Node<TurnState> for GenerateSqlNode {
    fn id(&self) -> &str {
        node_ids::GENERATE_SQL
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let config = &self.ctx.config;
        let instruction = state
            .conversation
            .pending_instruction
            .clone()
            .unwrap_or_default();
        let (today, yesterday) = date_vars(state.today);
        let filters = filters_text(&state);
        let system = Prompts::render(
            &config.prompts.generate_sql,
            &[
                ("schema", config.schema.as_str()),
                ("references", config.reference_catalogue.as_str()),
                ("today", today.as_str()),
                ("yesterday", yesterday.as_str()),
                ("filters", filters.as_str()),
                ("instruction", instruction.as_str()),
            ],
        );
        let outcome = match self
            .ctx
            .ask(
                node_ids::GENERATE_SQL,
                config.timeouts.generate,
                &system,
                &[Message::user(instruction)],
            )
            .await
        {
            Ok(reply) => GenerationOutcome::from_reply(&reply),
            Err(reason) => GenerationOutcome::Failed { reason },
        };
        if let GenerationOutcome::Failed { reason } = &outcome {
            tracing::warn!(%reason, "no SQL drafted");
        }
        state.conversation.draft_sql = outcome.sql().map(str::to_string);
        state.generation = Some(outcome);
        Ok((state, Next::Continue))
    }
}
