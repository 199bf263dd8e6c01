//! Stage nodes of the dialogue graph. Each node holds the shared
//! [`StageContext`](super::context::StageContext) and mutates [`TurnState`].

mod authorize;
mod cancel;
mod comment;
mod generate;
mod intent;
mod relevance;
mod reply;
mod resolve;
mod start;
mod validate;

pub(crate) use authorize::AuthorizeNode;
pub(crate) use cancel::CancelNode;
pub(crate) use comment::CommentNode;
pub(crate) use generate::GenerateSqlNode;
pub(crate) use intent::IntentNode;
pub(crate) use relevance::RelevanceNode;
pub(crate) use reply::ReplyNode;
pub(crate) use resolve::ResolveNode;
pub(crate) use start::StartNode;
pub(crate) use validate::ValidateNode;

use crate::message::Message;
use crate::state::{TurnState, Utterance};

fn to_messages<'a>(utterances: impl IntoIterator<Item = &'a Utterance>) -> Vec<Message> {
    utterances.into_iter().map(Utterance::to_message).collect()
}

/// Latest utterance plus up to `n` earlier ones, skipping scoped answers.
fn classifier_messages(state: &TurnState, n: usize) -> Vec<Message> {
    to_messages(state.conversation.recent_unscoped(n + 1))
}
