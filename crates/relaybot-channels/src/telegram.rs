use async_trait::async_trait;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, MessageId, ReplyParameters};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::traits::{ChannelLifecycle, ChannelSender, ChannelStatus};
use relaybot_common::{ConversationId, Error, InboundMessage, OutboundMessage, Result};

/// Long-polling Telegram transport.
///
/// Every text message from a human sender is forwarded to `inbound` as an
/// [`InboundMessage`]; replies go out through a [`TelegramSender`].
pub struct TelegramChannel {
    bot: Bot,
    display: String,
    status: ChannelStatus,
    inbound: mpsc::Sender<InboundMessage>,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl TelegramChannel {
    pub fn new(bot_token: &str, inbound: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            bot: Bot::new(bot_token),
            display: "Telegram".to_string(),
            status: ChannelStatus::Disconnected,
            inbound,
            shutdown_tx: None,
        }
    }
}

/// Converts a Telegram update into an inbound message.
/// Returns None if the message should be ignored (no text, from a bot, or no sender).
fn extract_inbound(msg: &teloxide::types::Message) -> Option<InboundMessage> {
    let text = msg.text()?;

    // Ignore messages without a sender (e.g. channel posts)
    let user = msg.from.as_ref()?;

    // Telegram "Group Anonymous Bot" ID used for anonymous admins.
    const ANONYMOUS_BOT_ID: u64 = 1087968824;

    // Ignore bots to prevent loops, but allow anonymous admins.
    if user.is_bot && user.id.0 != ANONYMOUS_BOT_ID {
        return None;
    }

    Some(InboundMessage {
        conversation_id: ConversationId(msg.chat.id.0),
        message_id: msg.id.0,
        text: text.to_string(),
    })
}

#[async_trait]
impl ChannelLifecycle for TelegramChannel {
    fn display_name(&self) -> &str {
        &self.display
    }

    async fn connect(&mut self) -> Result<()> {
        self.status = ChannelStatus::Connecting;
        let me = match self.bot.get_me().await {
            Ok(me) => me,
            Err(e) => {
                self.status = ChannelStatus::Error(e.to_string());
                return Err(Error::Channel(format!("telegram authorization failed: {e}")));
            }
        };
        info!("authorized on telegram account @{}", me.username());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let bot = self.bot.clone();
        let inbound = self.inbound.clone();

        tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: teloxide::types::Message| {
                let inbound = inbound.clone();
                async move {
                    let Some(message) = extract_inbound(&msg) else {
                        return respond(());
                    };

                    debug!(
                        "telegram message {} in chat {}: {} chars",
                        message.message_id,
                        message.conversation_id,
                        message.text.chars().count()
                    );

                    if inbound.send(message).await.is_err() {
                        warn!("inbound queue closed, dropping telegram message");
                    }
                    respond(())
                }
            });

            let mut dispatcher = Dispatcher::builder(bot, handler)
                .default_handler(|upd| async move {
                    tracing::trace!("unhandled update: {:?}", upd.kind);
                })
                .build();

            let token = dispatcher.shutdown_token();
            tokio::spawn(async move {
                let mut rx = shutdown_rx;
                while rx.changed().await.is_ok() {
                    if *rx.borrow() {
                        if let Err(e) = token.shutdown() {
                            warn!("telegram shutdown token error: {e:?}");
                        }
                        break;
                    }
                }
            });

            info!("telegram bot polling started");
            dispatcher.dispatch().await;
            info!("telegram bot polling stopped");
        });

        self.status = ChannelStatus::Connected;
        info!("telegram channel connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.status = ChannelStatus::Disconnected;
        info!("telegram channel disconnected");
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.clone()
    }

    fn create_sender(&self) -> Box<dyn ChannelSender> {
        Box::new(TelegramSender {
            bot: self.bot.clone(),
        })
    }
}

/// Send-only Telegram handle, cheap to clone and share across tasks.
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

#[async_trait]
impl ChannelSender for TelegramSender {
    fn channel_type(&self) -> &str {
        "telegram"
    }

    async fn send_message(&self, message: &OutboundMessage) -> Result<()> {
        let chat_id = ChatId(message.conversation_id.as_i64());
        let mut request = self.bot.send_message(chat_id, &message.text);
        if let Some(reply_to) = message.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
        }
        request
            .await
            .map_err(|e| Error::Channel(format!("telegram send failed: {e}")))?;
        Ok(())
    }

    async fn send_typing(&self, conversation_id: ConversationId) -> Result<()> {
        self.bot
            .send_chat_action(ChatId(conversation_id.as_i64()), ChatAction::Typing)
            .await
            .map_err(|e| Error::Channel(format!("telegram chat action failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> teloxide::types::Message {
        serde_json::from_str(json).expect("failed to parse json")
    }

    #[tokio::test]
    async fn new_channel_is_disconnected() {
        let (tx, _rx) = mpsc::channel(1);
        let channel = TelegramChannel::new("123456:fake-token", tx);
        assert_eq!(channel.display_name(), "Telegram");
        assert_eq!(channel.status(), ChannelStatus::Disconnected);
        assert_eq!(channel.create_sender().channel_type(), "telegram");
    }

    #[test]
    fn test_extract_inbound_private() {
        let msg = parse(
            r#"{
            "message_id": 1,
            "date": 1620000000,
            "chat": {
                "id": 12345,
                "type": "private",
                "first_name": "Alice"
            },
            "from": {
                "id": 111,
                "is_bot": false,
                "first_name": "Alice",
                "username": "alice"
            },
            "text": "hello"
        }"#,
        );

        let inbound = extract_inbound(&msg).expect("should extract message");
        assert_eq!(inbound.conversation_id, ConversationId(12345));
        assert_eq!(inbound.message_id, 1);
        assert_eq!(inbound.text, "hello");
    }

    #[test]
    fn test_extract_inbound_group() {
        // Group chats have negative ids.
        let msg = parse(
            r#"{
            "message_id": 2,
            "date": 1620000000,
            "chat": {
                "id": -987654321,
                "type": "supergroup",
                "title": "My Group"
            },
            "from": {
                "id": 222,
                "is_bot": false,
                "first_name": "Bob"
            },
            "text": "/keys"
        }"#,
        );

        let inbound = extract_inbound(&msg).expect("should extract message");
        assert_eq!(inbound.conversation_id, ConversationId(-987654321));
        assert_eq!(inbound.message_id, 2);
        assert_eq!(inbound.text, "/keys");
    }

    #[test]
    fn test_extract_inbound_bot_ignored() {
        let msg = parse(
            r#"{
            "message_id": 3,
            "date": 1620000000,
            "chat": {
                "id": 12345,
                "type": "private"
            },
            "from": {
                "id": 333,
                "is_bot": true,
                "first_name": "SomeBot"
            },
            "text": "I am a bot"
        }"#,
        );

        assert!(extract_inbound(&msg).is_none(), "should ignore bot messages");
    }

    #[test]
    fn test_extract_inbound_anonymous_admin_allowed() {
        let msg = parse(
            r#"{
            "message_id": 5,
            "date": 1620000000,
            "chat": {
                "id": -987654321,
                "type": "supergroup",
                "title": "My Group"
            },
            "from": {
                "id": 1087968824,
                "is_bot": true,
                "first_name": "Group Anonymous Bot",
                "username": "GroupAnonymousBot"
            },
            "sender_chat": {
                 "id": -987654321,
                 "type": "supergroup",
                 "title": "My Group"
            },
            "text": "admin question"
        }"#,
        );

        let inbound = extract_inbound(&msg).expect("should allow anonymous admin");
        assert_eq!(inbound.conversation_id, ConversationId(-987654321));
    }

    #[test]
    fn test_extract_inbound_channel_post_ignored() {
        let msg = parse(
            r#"{
            "message_id": 4,
            "date": 1620000000,
            "chat": {
                "id": -1001234567890,
                "type": "channel",
                "title": "My Channel"
            },
            "text": "channel post"
        }"#,
        );

        assert!(
            extract_inbound(&msg).is_none(),
            "should ignore messages without sender (channel posts)"
        );
    }
}
