use dashmap::DashMap;
use relaybot_common::{ChatMessage, ConversationId};
use tracing::debug;

/// Messages kept per conversation: five user/assistant turns.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Chronological message history of one conversation, capped at `window`
/// entries. The oldest messages are dropped first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    window: usize,
}

impl ConversationHistory {
    pub fn new(window: usize) -> Self {
        Self {
            messages: Vec::with_capacity(window),
            window,
        }
    }

    /// Append a user message and its reply, then evict down to the window.
    pub fn push_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(ChatMessage::user(user));
        self.messages.push(ChatMessage::assistant(assistant));
        if self.messages.len() > self.window {
            let excess = self.messages.len() - self.window;
            self.messages.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

/// Process-wide map from conversation to its bounded history.
///
/// Backed by a sharded concurrent map: every operation on one conversation
/// runs under that key's shard lock, so appends are never lost and readers
/// never see a half-written history, while unrelated conversations proceed in
/// parallel. Callers get clones and never hold a lock across an await.
pub struct ConversationStore {
    entries: DashMap<ConversationId, ConversationHistory>,
    window: usize,
}

impl ConversationStore {
    pub fn new(window: usize) -> Self {
        Self {
            entries: DashMap::new(),
            window,
        }
    }

    /// Snapshot of the conversation's history, creating an empty one on first use.
    pub fn get_history(&self, id: ConversationId) -> ConversationHistory {
        self.entries
            .entry(id)
            .or_insert_with(|| ConversationHistory::new(self.window))
            .value()
            .clone()
    }

    /// Record a completed exchange.
    pub fn append_turn(
        &self,
        id: ConversationId,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) {
        let mut entry = self
            .entries
            .entry(id)
            .or_insert_with(|| ConversationHistory::new(self.window));
        entry.push_turn(user, assistant);
        debug!("conversation {id} now holds {} messages", entry.len());
    }

    /// Reset the conversation to an empty history. The entry itself is kept.
    pub fn clear(&self, id: ConversationId) {
        self.entries
            .entry(id)
            .or_insert_with(|| ConversationHistory::new(self.window))
            .clear();
        debug!("conversation {id} cleared");
    }

    /// Number of stored messages, without creating an entry.
    pub fn len(&self, id: ConversationId) -> usize {
        self.entries.get(&id).map(|h| h.len()).unwrap_or(0)
    }

    /// Number of conversations seen so far.
    pub fn conversation_count(&self) -> usize {
        self.entries.len()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}
