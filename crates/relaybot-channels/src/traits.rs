use async_trait::async_trait;
use relaybot_common::{ConversationId, OutboundMessage, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle management for a chat transport (connect, disconnect, status).
#[async_trait]
pub trait ChannelLifecycle: Send {
    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Start receiving updates from the external service.
    async fn connect(&mut self) -> Result<()>;

    /// Stop receiving updates.
    async fn disconnect(&mut self) -> Result<()>;

    fn status(&self) -> ChannelStatus;

    /// Create a lightweight send-only handle for this channel.
    ///
    /// The returned sender is independent of the lifecycle and can be shared
    /// via `Arc` by every handler task while the channel keeps polling.
    fn create_sender(&self) -> Box<dyn ChannelSender>;
}

/// Send-only interface for delivering replies through a channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Unique identifier for this channel type.
    fn channel_type(&self) -> &str;

    /// Deliver a text message, threaded under `reply_to` when set.
    async fn send_message(&self, message: &OutboundMessage) -> Result<()>;

    /// Show a "typing" indicator in the conversation.
    async fn send_typing(&self, conversation_id: ConversationId) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}
