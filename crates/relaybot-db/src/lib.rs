pub mod conversation_store;

pub use conversation_store::{ConversationHistory, ConversationStore, DEFAULT_HISTORY_WINDOW};
