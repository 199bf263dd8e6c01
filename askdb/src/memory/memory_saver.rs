//! In-memory checkpoint store (MemorySaver). Not persistent; for tests and
//! single-process runs.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::memory::checkpointer::{CheckpointError, CheckpointStore};
use crate::state::ConversationState;

/// In-memory checkpoint store keyed by conversation key.
#[derive(Default)]
pub struct MemorySaver {
    inner: DashMap<String, ConversationState>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemorySaver {
    async fn load(&self, key: &str) -> Result<Option<ConversationState>, CheckpointError> {
        Ok(self.inner.get(key).map(|s| s.value().clone()))
    }

    async fn save(&self, key: &str, state: &ConversationState) -> Result<(), CheckpointError> {
        self.inner.insert(key.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Save then load returns the same state; unknown keys load as None.
    #[tokio::test]
    async fn save_and_load() {
        let saver = MemorySaver::new();
        assert!(saver.load("k").await.unwrap().is_none());
        let mut state = ConversationState::new("A", "R1");
        state.pending_instruction = Some("x".into());
        saver.save("k", &state).await.unwrap();
        assert_eq!(saver.load("k").await.unwrap(), Some(state));
        assert_eq!(saver.len(), 1);
    }
}
