//! Node middleware: wrap node.run with external async logic (around pattern).

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use crate::error::AgentError;

use super::Next;

/// The wrapped node call handed to [`NodeMiddleware::around_run`].
pub type NodeRunFn<S> = Box<
    dyn FnOnce(S) -> Pin<Box<dyn Future<Output = Result<(S, Next), AgentError>> + Send>> + Send,
>;

/// Async middleware that wraps node.run.
///
/// Implementations decide when to call `inner` and may inspect or modify the result.
#[async_trait]
pub trait NodeMiddleware<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// - `node_id`: current node id
    /// - `state`: state passed to the node
    /// - `inner`: the node call; must be invoked to execute the node
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: NodeRunFn<S>,
    ) -> Result<(S, Next), AgentError>;
}
