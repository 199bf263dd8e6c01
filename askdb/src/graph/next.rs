//! Next-step result from a graph node: follow the edge, jump to a node, or end.

/// Next step after running a node.
///
/// - **Continue**: follow the node's outgoing edge (or its conditional router).
/// - **Node(id)**: jump to the given node.
/// - **End**: stop; return current state as final result.
///
/// A conditional router, when the node has one, takes precedence over the
/// returned value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Next {
    Continue,
    Node(String),
    End,
}
