pub mod error;
pub mod message;
pub mod types;

pub use error::{Error, Result};
pub use message::{ChatMessage, ChatRole, InboundMessage, OutboundMessage};
pub use types::ConversationId;
