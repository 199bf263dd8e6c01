//! Conversation persistence: checkpoint store trait, in-memory and SQLite
//! savers, and per-key turn locks.

mod checkpointer;
mod locks;
mod memory_saver;
mod sqlite_saver;

pub use checkpointer::{CheckpointError, CheckpointStore};
pub use locks::{ConversationGuard, ConversationLocks};
pub use memory_saver::MemorySaver;
pub use sqlite_saver::SqliteSaver;
