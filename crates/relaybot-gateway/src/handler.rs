use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use relaybot_common::{ConversationId, InboundMessage, OutboundMessage};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use crate::commands::{self, CLEARED_TEXT, Command, WELCOME_TEXT};
use crate::state::SharedState;

/// Routes inbound messages into per-conversation lanes.
///
/// Each conversation gets its own task fed by an unbounded queue, so messages
/// of one chat are answered strictly in arrival order and turn N+1 always sees
/// the history written by turn N. Different conversations run concurrently,
/// bounded only by the dispatch semaphore. A lane that stays idle for
/// `lane_idle` exits and is recreated on the next message.
#[derive(Clone)]
pub struct ConcurrentHandler {
    inner: Arc<Inner>,
}

struct Inner {
    state: SharedState,
    lanes: DashMap<ConversationId, mpsc::UnboundedSender<InboundMessage>>,
    permits: Semaphore,
    lane_idle: Duration,
}

impl ConcurrentHandler {
    pub fn new(state: SharedState, max_concurrent_dispatches: usize, lane_idle: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state,
                lanes: DashMap::new(),
                permits: Semaphore::new(max_concurrent_dispatches.max(1)),
                lane_idle,
            }),
        }
    }

    /// Queue a message on its conversation's lane. Never waits on the backend.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, message: InboundMessage) {
        let id = message.conversation_id;
        let mut pending = message;
        loop {
            // Send while holding the entry so a lane cannot retire between
            // lookup and enqueue.
            let sent = {
                let lane = self
                    .inner
                    .lanes
                    .entry(id)
                    .or_insert_with(|| self.spawn_lane(id));
                lane.send(pending)
            };

            match sent {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    // The lane task is gone without retiring (it panicked).
                    warn!("lane for conversation {id} died, restarting");
                    self.inner.lanes.remove_if(&id, |_, tx| tx.is_closed());
                    pending = returned;
                }
            }
        }
    }

    /// Process one message to completion on the current task.
    pub async fn handle(&self, message: InboundMessage) {
        self.inner.handle(message).await;
    }

    /// Number of conversations with a live lane.
    pub fn active_lanes(&self) -> usize {
        self.inner.lanes.len()
    }

    fn spawn_lane(&self, id: ConversationId) -> mpsc::UnboundedSender<InboundMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(run_lane(inner, id, rx));
        debug!("opened lane for conversation {id}");
        tx
    }
}

async fn run_lane(
    inner: Arc<Inner>,
    id: ConversationId,
    mut rx: mpsc::UnboundedReceiver<InboundMessage>,
) {
    loop {
        match tokio::time::timeout(inner.lane_idle, rx.recv()).await {
            Ok(Some(message)) => {
                // A panic in one message must not take the rest of the queue
                // down with the lane.
                if AssertUnwindSafe(inner.handle(message))
                    .catch_unwind()
                    .await
                    .is_err()
                {
                    error!("handler panicked in conversation {id}, continuing with next message");
                }
            }
            Ok(None) => break,
            Err(_) => {
                // Submitters enqueue under the entry lock, so an empty queue
                // checked under that same lock means nothing can be lost.
                let retired = inner.lanes.remove_if(&id, |_, _| rx.is_empty()).is_some();
                if retired {
                    debug!("closed idle lane for conversation {id}");
                    return;
                }
            }
        }
    }
}

impl Inner {
    async fn handle(&self, message: InboundMessage) {
        let id = message.conversation_id;

        if let Err(e) = self.state.sender.send_typing(id).await {
            debug!("typing indicator failed for conversation {id}: {e}");
        }

        let reply = match commands::parse(&message.text) {
            Some(command) => OutboundMessage::text(id, self.run_command(command, id)),
            None => OutboundMessage::reply(&message, self.converse(&message).await),
        };

        if let Err(e) = self.state.sender.send_message(&reply).await {
            warn!("failed to deliver reply to conversation {id}: {e}");
        }
    }

    fn run_command(&self, command: Command, id: ConversationId) -> String {
        match command {
            Command::Start => {
                self.state.store.clear(id);
                info!("conversation {id} started");
                WELCOME_TEXT.to_string()
            }
            Command::Clear => {
                self.state.store.clear(id);
                CLEARED_TEXT.to_string()
            }
            Command::Keys => {
                let pool = self.state.pool();
                commands::keys_text(pool.current_slot(), pool.size())
            }
        }
    }

    /// Ask the backend and record the turn. Failed exchanges are never stored.
    async fn converse(&self, message: &InboundMessage) -> String {
        let id = message.conversation_id;
        let history = self.state.store.get_history(id);

        let result = match self.permits.acquire().await {
            Ok(_permit) => {
                self.state
                    .dispatcher
                    .dispatch(history.messages(), &message.text)
                    .await
            }
            Err(e) => {
                warn!("dispatch limiter unavailable: {e}");
                return format!("⚠️ Service is shutting down.\nError: {e}");
            }
        };

        match result {
            Ok(reply) => {
                self.state
                    .store
                    .append_turn(id, message.text.clone(), reply.clone());
                reply
            }
            Err(e) => {
                warn!("completion failed for conversation {id}: {e}");
                format!("⚠️ {}\nError: {e}", e.user_message())
            }
        }
    }
}
