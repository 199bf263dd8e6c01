//! Graph node trait: one step in a StateGraph.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AgentError;

use super::Next;

/// One step in a graph: state in, (state out, next step).
///
/// **Interaction**: Registered with `StateGraph::add_node`; driven by
/// `CompiledStateGraph::invoke`, optionally through a `NodeMiddleware`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"intent"`, `"authorize"`). Must be unique within a graph.
    fn id(&self) -> &str;

    async fn run(&self, state: S) -> Result<(S, Next), AgentError>;
}
