use std::sync::Arc;

use relaybot_agents::RequestDispatcher;
use relaybot_channels::ChannelSender;
use relaybot_db::ConversationStore;
use relaybot_security::CredentialPool;

/// Services shared by every handler task, built once at startup.
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
    pub store: Arc<ConversationStore>,
    pub sender: Arc<dyn ChannelSender>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        store: Arc<ConversationStore>,
        sender: Arc<dyn ChannelSender>,
    ) -> Self {
        Self {
            dispatcher,
            store,
            sender,
        }
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        self.dispatcher.pool()
    }
}
