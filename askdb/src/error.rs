//! Error types for node execution and for a whole turn.
//!
//! Collaborator failures (LLM, entity resolution, rule store) never show up
//! here: nodes recover from them with sentinel values. `AgentError` covers a
//! node that cannot run at all; `TurnError` is what `Orchestrator::run` returns.

use thiserror::Error;

use crate::auth::sql::SqlError;
use crate::graph::CompilationError;
use crate::memory::CheckpointError;

/// Node execution error.
///
/// Returned by `Node::run` when a step cannot produce a state (e.g. a stage
/// entered without the fields it needs). Aborts the graph run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Caller-facing error of one turn.
///
/// Clarification and cancellation are normal outputs, never errors. Only a
/// checkpoint store failure (or a broken graph) ends a turn without output.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Conversation state could not be loaded or saved; the turn did not run
    /// or its result was not persisted.
    #[error("checkpoint store unavailable: {0}")]
    CheckpointUnavailable(#[source] CheckpointError),

    /// The dialogue graph failed while executing a node.
    #[error("turn execution failed: {0}")]
    Execution(#[from] AgentError),

    /// The dialogue graph could not be built.
    #[error("dialogue graph invalid: {0}")]
    Graph(#[from] CompilationError),

    /// The configured SQL dialect is unknown.
    #[error("invalid SQL dialect: {0}")]
    Dialect(#[from] SqlError),
}

impl TurnError {
    /// Stable code for transports that map errors to numbers or strings.
    pub fn code(&self) -> &'static str {
        match self {
            TurnError::CheckpointUnavailable(_) => "CHECKPOINT_UNAVAILABLE",
            TurnError::Execution(_) => "EXECUTION_FAILED",
            TurnError::Graph(_) => "GRAPH_INVALID",
            TurnError::Dialect(_) => "DIALECT_INVALID",
        }
    }
}
