pub mod conversation;

pub use conversation::{ConversationGuard, ConversationStore};
