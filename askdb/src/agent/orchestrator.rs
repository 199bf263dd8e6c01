//! Orchestrator: runs one dialogue turn per call, persisting conversation state.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};

use super::context::StageContext;
use super::graph::build_graph;
use crate::auth::{AuthorizationEngine, RuleStore, SqlAdapter};
use crate::config::OrchestratorConfig;
use crate::error::{AgentError, TurnError};
use crate::graph::CompiledStateGraph;
use crate::llm::LlmClient;
use crate::memory::{CheckpointError, CheckpointStore, ConversationLocks};
use crate::output::TurnOutput;
use crate::resolve::EntityResolver;
use crate::state::{ConversationState, TurnState};

/// Source of "today" for date placeholders.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// External collaborators of the orchestrator.
pub struct Collaborators {
    pub llm: Arc<dyn LlmClient>,
    pub resolver: Arc<dyn EntityResolver>,
    pub rules: Arc<dyn RuleStore>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

/// One inbound utterance.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub subject: String,
    pub conversation_key: String,
    /// Resource matched against access rules; defaults to the conversation key.
    pub resource: Option<String>,
    pub utterance: String,
}

/// Runs turns of the NL-to-SQL dialogue.
///
/// Turns for the same `(subject, conversation_key)` are serialized from
/// checkpoint load to checkpoint save; other keys run concurrently.
///
/// **Interaction**: Built from [`OrchestratorConfig`] and [`Collaborators`];
/// called by the CLI (or any transport) once per inbound message.
pub struct Orchestrator {
    graph: CompiledStateGraph<TurnState>,
    checkpoints: Arc<dyn CheckpointStore>,
    locks: ConversationLocks,
    checkpoint_timeout: std::time::Duration,
    clock: Clock,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, collaborators: Collaborators) -> Result<Self, TurnError> {
        let sql = SqlAdapter::new(config.dialect.clone())?;
        let auth = AuthorizationEngine::new(collaborators.rules, sql)
            .with_lookup_timeout(config.timeouts.authorize);
        let checkpoint_timeout = config.timeouts.checkpoint;
        let ctx = Arc::new(StageContext {
            llm: collaborators.llm,
            resolver: collaborators.resolver,
            auth,
            config,
        });
        Ok(Self {
            graph: build_graph(ctx)?,
            checkpoints: collaborators.checkpoints,
            locks: ConversationLocks::new(),
            checkpoint_timeout,
            clock: Arc::new(|| Local::now().date_naive()),
        })
    }

    /// Replaces the local-date clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// One turn where the resource equals the conversation key.
    pub async fn run(
        &self,
        subject: &str,
        conversation_key: &str,
        utterance: &str,
    ) -> Result<TurnOutput, TurnError> {
        self.run_request(TurnRequest {
            subject: subject.to_string(),
            conversation_key: conversation_key.to_string(),
            resource: None,
            utterance: utterance.to_string(),
        })
        .await
    }

    pub async fn run_request(&self, request: TurnRequest) -> Result<TurnOutput, TurnError> {
        let key = checkpoint_key(&request.subject, &request.conversation_key);
        let resource = request
            .resource
            .unwrap_or_else(|| request.conversation_key.clone());
        let _guard = self.locks.acquire(&key).await;

        let loaded = self.checkpoint(self.checkpoints.load(&key)).await?;
        let mut conversation =
            loaded.unwrap_or_else(|| ConversationState::new(request.subject.clone(), ""));
        conversation.resource = resource;

        let mut turn = TurnState::new(conversation, request.utterance);
        turn.today = (self.clock)();
        tracing::info!(
            key = %key,
            resumed = turn.conversation.is_awaiting_clarification(),
            "turn start"
        );

        let done = self.graph.invoke(turn).await?;
        let mut conversation = done.conversation;
        conversation.updated_at = Utc::now();
        self.checkpoint(self.checkpoints.save(&key, &conversation))
            .await?;

        let output = done.output.ok_or_else(|| {
            TurnError::Execution(AgentError::ExecutionFailed(
                "turn ended without output".into(),
            ))
        })?;
        tracing::info!(
            key = %key,
            kind = ?output.kind,
            restriction_applied = output.restriction_applied,
            "turn complete"
        );
        Ok(output)
    }

    async fn checkpoint<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, CheckpointError>>,
    ) -> Result<T, TurnError> {
        match tokio::time::timeout(self.checkpoint_timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                tracing::error!(error = %e, "checkpoint store failed");
                TurnError::CheckpointUnavailable(e)
            }),
            Err(_) => {
                tracing::error!("checkpoint store timed out");
                Err(TurnError::CheckpointUnavailable(CheckpointError::Timeout(
                    self.checkpoint_timeout,
                )))
            }
        }
    }
}

/// Persistence key of a conversation.
pub fn checkpoint_key(subject: &str, conversation_key: &str) -> String {
    format!("{}/{}", subject, conversation_key)
}
