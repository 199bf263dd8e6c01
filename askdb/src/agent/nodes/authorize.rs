//! Authorize node: scopes the draft to the subject's rights.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::context::StageContext;
use crate::agent::node_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::state::TurnState;

pub(crate) struct AuthorizeNode {
    ctx: Arc<StageContext>,
}

impl AuthorizeNode {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Node<TurnState> for AuthorizeNode {
    fn id(&self) -> &str {
        node_ids::AUTHORIZE
    }

    async fn run(&self, mut state: TurnState) -> Result<(TurnState, Next), AgentError> {
        let conversation = &mut state.conversation;
        let Some(draft) = conversation.draft_sql.clone() else {
            return Ok((state, Next::Continue));
        };
        let rewrite = self
            .ctx
            .auth
            .rewrite(&draft, &conversation.subject, &conversation.resource)
            .await;
        if rewrite.applied {
            tracing::debug!(decision = ?rewrite.decision, "restriction applied");
        } else {
            tracing::warn!(
                sql = %draft,
                subject = %conversation.subject,
                decision = ?rewrite.decision,
                "statement left unscoped"
            );
        }
        conversation.final_sql = Some(rewrite.sql);
        conversation.restriction_applied = rewrite.applied;
        Ok((state, Next::Continue))
    }
}
