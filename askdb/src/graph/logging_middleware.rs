//! Middleware that traces node enter/exit around each node.run call.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Instant;

use crate::error::AgentError;
use crate::graph::Next;

use super::{NodeMiddleware, NodeRunFn};

/// Emits a `debug` event on enter and on exit (with elapsed time and the
/// returned `Next`, or the error). Only the node id is logged, never state.
pub struct LoggingNodeMiddleware<S> {
    _phantom: std::marker::PhantomData<S>,
}

impl<S> Default for LoggingNodeMiddleware<S> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<S> NodeMiddleware<S> for LoggingNodeMiddleware<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: NodeRunFn<S>,
    ) -> Result<(S, Next), AgentError> {
        tracing::debug!(node = node_id, "node enter");
        let started = Instant::now();
        let result = inner(state).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok((_, next)) => {
                tracing::debug!(node = node_id, elapsed_ms, next = ?next, "node exit")
            }
            Err(e) => tracing::debug!(node = node_id, elapsed_ms, error = %e, "node failed"),
        }
        result
    }
}
