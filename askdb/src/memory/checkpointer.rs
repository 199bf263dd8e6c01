//! CheckpointStore trait and CheckpointError.
//!
//! Loads and saves one [`ConversationState`] per conversation key. The store is
//! the only mutable shared resource of a turn; the orchestrator serializes
//! access per key (see [`super::ConversationLocks`]).

use async_trait::async_trait;

use crate::state::ConversationState;

/// Error type for checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Key-value persistence of conversation state.
///
/// **Interaction**: Injected into `Orchestrator`; `load` at turn start, `save`
/// after the graph run.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Latest state for `key`, or `None` for a new conversation.
    async fn load(&self, key: &str) -> Result<Option<ConversationState>, CheckpointError>;

    /// Replaces the state stored for `key`.
    async fn save(&self, key: &str, state: &ConversationState) -> Result<(), CheckpointError>;
}
