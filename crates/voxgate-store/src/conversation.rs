use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use voxgate_core::ids::ConversationId;
use voxgate_core::messages::ChatMessage;

/// Per-conversation mutable state: append-only history plus the mutex that
/// serializes webhook dispatches for the conversation.
struct ConversationEntry {
    lock: Arc<Mutex<()>>,
    history: RwLock<Vec<ChatMessage>>,
}

impl ConversationEntry {
    fn new() -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            history: RwLock::new(Vec::new()),
        }
    }
}

/// Exclusive hold on a conversation. Dropping the guard releases the lock,
/// so every exit path — including error paths — releases exactly once.
pub struct ConversationGuard {
    _permit: OwnedMutexGuard<()>,
}

/// In-memory conversation state, keyed by conversation id. Entries are
/// created lazily on first lock acquisition or append and live for the
/// process lifetime; history only ever grows.
#[derive(Default)]
pub struct ConversationStore {
    conversations: DashMap<ConversationId, Arc<ConversationEntry>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the conversation's dedicated lock, creating it on first use.
    /// Blocks until the previous holder (if any) releases. The map shard
    /// lock makes get-or-create atomic, so two concurrent first requests
    /// for one id always share a single mutex.
    pub async fn acquire(&self, conversation_id: &ConversationId) -> ConversationGuard {
        let lock = {
            let entry = self
                .conversations
                .entry(conversation_id.clone())
                .or_insert_with(|| Arc::new(ConversationEntry::new()));
            Arc::clone(&entry.lock)
        };
        let permit = lock.lock_owned().await;
        ConversationGuard { _permit: permit }
    }

    /// Append messages to the end of the conversation history. No-op for an
    /// empty batch.
    pub fn append(&self, conversation_id: &ConversationId, messages: Vec<ChatMessage>) {
        if messages.is_empty() {
            return;
        }
        let entry = self
            .conversations
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(ConversationEntry::new()));
        entry.history.write().extend(messages);
    }

    /// A copy of the history as of this call. Unknown ids yield an empty
    /// history and do not create a record.
    pub fn history(&self, conversation_id: &ConversationId) -> Vec<ChatMessage> {
        self.conversations
            .get(conversation_id)
            .map(|entry| entry.history.read().clone())
            .unwrap_or_default()
    }

    /// Number of conversations seen so far.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
