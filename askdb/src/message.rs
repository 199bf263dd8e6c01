//! Chat message types sent to the language model.
//!
//! Roles: System (usually first in the list), User, Assistant. Conversation
//! history lives in [`crate::state::Utterance`]; it is converted to `Message`
//! only when a prompt is assembled.

use serde::{Deserialize, Serialize};

/// A single message in an LLM request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// System prompt; typically placed first in the message list.
    System(String),
    /// User input.
    User(String),
    /// Model reply.
    Assistant(String),
}

impl Message {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(content.into())
    }

    /// Text of the message regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Message::System(s) | Message::User(s) | Message::Assistant(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: system/user/assistant constructors produce the correct variant with content.
    #[test]
    fn message_system_user_assistant_constructors() {
        let sys = Message::system("s");
        assert!(matches!(&sys, Message::System(c) if c == "s"));
        let usr = Message::user("u");
        assert!(matches!(&usr, Message::User(c) if c == "u"));
        let ast = Message::assistant("a");
        assert!(matches!(&ast, Message::Assistant(c) if c == "a"));
        assert_eq!(ast.content(), "a");
    }
}
