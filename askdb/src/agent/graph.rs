//! Wiring of the stage nodes into the dialogue graph.

use std::collections::HashMap;
use std::sync::Arc;

use super::context::StageContext;
use super::node_ids::*;
use super::nodes::*;
use crate::graph::{
    CompilationError, CompiledStateGraph, LoggingNodeMiddleware, StateGraph, END,
    START as GRAPH_START,
};
use crate::state::{GenerationOutcome, Intent, Relevance, TurnState, ValidationOutcome};

fn route_start(state: &TurnState) -> String {
    let next = if state.cancel_requested {
        CANCEL
    } else if state.resumed {
        VALIDATE
    } else {
        INTENT
    };
    next.to_string()
}

fn route_intent(state: &TurnState) -> String {
    let next = match state.intent {
        Some(Intent::Greeting) | Some(Intent::Chitchat) => REPLY,
        Some(Intent::DatabaseQuestion) | None => RELEVANCE,
    };
    next.to_string()
}

fn route_relevance(state: &TurnState) -> String {
    let next = match state.relevance {
        Some(Relevance::OutOfDomain) => REPLY,
        Some(Relevance::InDomain) | None => VALIDATE,
    };
    next.to_string()
}

fn route_validate(state: &TurnState) -> String {
    let next = match &state.validation {
        Some(ValidationOutcome::Accepted { .. }) => RESOLVE,
        Some(ValidationOutcome::NeedsClarification { .. }) => END,
        Some(ValidationOutcome::Cancelled) => CANCEL,
        Some(ValidationOutcome::Failed { .. }) | None => REPLY,
    };
    next.to_string()
}

fn route_generate(state: &TurnState) -> String {
    let next = match &state.generation {
        Some(GenerationOutcome::Generated { .. }) => AUTHORIZE,
        _ => COMMENT,
    };
    next.to_string()
}

fn targets(ids: &[&str]) -> Option<HashMap<String, String>> {
    Some(
        ids.iter()
            .map(|id| (id.to_string(), id.to_string()))
            .collect(),
    )
}

pub(crate) fn build_graph(
    ctx: Arc<StageContext>,
) -> Result<CompiledStateGraph<TurnState>, CompilationError> {
    let mut graph = StateGraph::<TurnState>::new()
        .with_middleware(Arc::new(LoggingNodeMiddleware::<TurnState>::default()));
    graph
        .add_node(START, Arc::new(StartNode::new(ctx.clone())))
        .add_node(INTENT, Arc::new(IntentNode::new(ctx.clone())))
        .add_node(RELEVANCE, Arc::new(RelevanceNode::new(ctx.clone())))
        .add_node(VALIDATE, Arc::new(ValidateNode::new(ctx.clone())))
        .add_node(RESOLVE, Arc::new(ResolveNode::new(ctx.clone())))
        .add_node(GENERATE_SQL, Arc::new(GenerateSqlNode::new(ctx.clone())))
        .add_node(AUTHORIZE, Arc::new(AuthorizeNode::new(ctx.clone())))
        .add_node(COMMENT, Arc::new(CommentNode::new(ctx.clone())))
        .add_node(REPLY, Arc::new(ReplyNode::new(ctx.clone())))
        .add_node(CANCEL, Arc::new(CancelNode::new(ctx)));

    graph
        .add_edge(GRAPH_START, START)
        .add_edge(RESOLVE, GENERATE_SQL)
        .add_edge(AUTHORIZE, COMMENT)
        .add_edge(COMMENT, END)
        .add_edge(REPLY, END)
        .add_edge(CANCEL, END);

    graph
        .add_conditional_edges(
            START,
            Arc::new(route_start),
            targets(&[CANCEL, VALIDATE, INTENT]),
        )
        .add_conditional_edges(INTENT, Arc::new(route_intent), targets(&[REPLY, RELEVANCE]))
        .add_conditional_edges(
            RELEVANCE,
            Arc::new(route_relevance),
            targets(&[REPLY, VALIDATE]),
        )
        .add_conditional_edges(
            VALIDATE,
            Arc::new(route_validate),
            targets(&[RESOLVE, END, CANCEL, REPLY]),
        )
        .add_conditional_edges(
            GENERATE_SQL,
            Arc::new(route_generate),
            targets(&[AUTHORIZE, COMMENT]),
        );

    graph.compile()
}
