//! Compiled graph: immutable, supports invoke only.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;
use crate::graph::conditional::NextEntry;
use crate::graph::node::Node;
use crate::graph::node_middleware::NodeMiddleware;
use crate::graph::state_graph::END;
use crate::graph::Next;

/// Compiled state graph produced by `StateGraph::compile`.
///
/// Starts at the node wired from START. After each node: a conditional router
/// (if any) decides the next node; otherwise `Next::Node(id)` jumps,
/// `Next::End` stops and `Next::Continue` follows the node's edge. A node with
/// no outgoing edge ends the run.
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) first_node_id: String,
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    pub(super) step_limit: usize,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Runs the graph to completion and returns the final state.
    pub async fn invoke(&self, state: S) -> Result<S, AgentError> {
        let mut state = state;
        let mut current_id = self.first_node_id.clone();
        let mut steps = 0usize;
        tracing::debug!(first = %current_id, "graph start");

        loop {
            steps += 1;
            if steps > self.step_limit {
                return Err(AgentError::ExecutionFailed(format!(
                    "step limit {} exceeded at node {}",
                    self.step_limit, current_id
                )));
            }
            let node = self.nodes.get(&current_id).cloned().ok_or_else(|| {
                AgentError::ExecutionFailed(format!("node not found: {}", current_id))
            })?;

            let (new_state, next) = match &self.middleware {
                Some(middleware) => {
                    let node = node.clone();
                    middleware
                        .around_run(
                            &current_id,
                            state,
                            Box::new(move |s| Box::pin(async move { node.run(s).await })),
                        )
                        .await?
                }
                None => node.run(state).await?,
            };
            state = new_state;

            let next_id = match self.next_map.get(&current_id) {
                Some(NextEntry::Conditional(router)) => {
                    let target = router.resolve_next(&state);
                    tracing::debug!(from = %current_id, to = %target, "conditional routing");
                    Some(target)
                }
                entry => match next {
                    Next::End => None,
                    Next::Node(id) => Some(id),
                    Next::Continue => match entry {
                        Some(NextEntry::Unconditional(id)) => Some(id.clone()),
                        _ => None,
                    },
                },
            };

            match next_id {
                Some(id) if id != END => current_id = id,
                _ => {
                    tracing::debug!(last = %current_id, steps, "graph complete");
                    return Ok(state);
                }
            }
        }
    }
}
