//! Conditional edges: route to the next node based on state.
//!
//! A source node has a routing function that returns a key; the key is looked
//! up in an optional path map, or used directly as the next node id.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Router function: takes a reference to state and returns a routing key.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Routing function plus optional path map.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub(super) path: ConditionalRouterFn<S>,
    pub(super) path_map: Option<HashMap<String, String>>,
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(path: ConditionalRouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Next node id (or END): `path_map[key]` if present, otherwise the key itself.
    pub fn resolve_next(&self, state: &S) -> String {
        let key = (self.path)(state);
        self.path_map
            .as_ref()
            .and_then(|m| m.get(&key))
            .cloned()
            .unwrap_or(key)
    }
}

/// How to determine the next node after a given node runs.
#[derive(Clone)]
pub(super) enum NextEntry<S> {
    /// Single fixed next node (or END). The node's `Next` is still respected.
    Unconditional(String),
    /// Next node is decided by the router from state; the node's `Next` is ignored.
    Conditional(ConditionalRouter<S>),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Mapped keys resolve through the map; unmapped keys pass through.
    #[test]
    fn resolve_next_uses_map_then_key() {
        let map: HashMap<String, String> =
            [("even".to_string(), "even_node".to_string())].into_iter().collect();
        let router = ConditionalRouter::new(
            Arc::new(|s: &i32| if s % 2 == 0 { "even".into() } else { "odd".into() }),
            Some(map),
        );
        assert_eq!(router.resolve_next(&2), "even_node");
        assert_eq!(router.resolve_next(&3), "odd");
    }
}
