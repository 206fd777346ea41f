use std::sync::Arc;

use relaybot_common::ChatMessage;
use relaybot_security::{Credential, CredentialPool};
use tracing::{info, instrument, warn};

use crate::backend::{CompletionBackend, CompletionRequest};
use crate::error::DispatchError;

/// Fixed parameters of every completion request.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Sends completion requests, rotating API keys when the backend reports a
/// rate limit.
///
/// A dispatch makes at most `pool.size()` backend calls and uses each key at
/// most once. Rotations advance the shared pool, so later dispatches start
/// from the last key that was not rate limited.
pub struct RequestDispatcher {
    backend: Arc<dyn CompletionBackend>,
    pool: Arc<CredentialPool>,
    settings: DispatcherSettings,
}

impl RequestDispatcher {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        pool: Arc<CredentialPool>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            backend,
            pool,
            settings,
        }
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// `[system] + history + [user]`, with the configured model parameters.
    pub fn build_request(&self, history: &[ChatMessage], user_text: &str) -> CompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.settings.system_prompt.clone()));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(user_text));

        CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            stream: false,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// Generate a reply to `user_text` given the prior conversation.
    #[instrument(skip_all, fields(backend = self.backend.backend_id(), history = history.len()))]
    pub async fn dispatch(
        &self,
        history: &[ChatMessage],
        user_text: &str,
    ) -> Result<String, DispatchError> {
        let request = self.build_request(history, user_text);
        let attempts = self.pool.size();
        let mut tried = vec![false; attempts];
        let mut credential = self.pool.current();
        let mut last_error = String::new();

        for attempt in 0..attempts {
            if tried[credential.slot()] {
                // Another dispatch rotated the shared pool back onto a key this
                // request already used.
                if let Some(untried) = self.next_untried(&tried, credential.slot()) {
                    credential = untried;
                }
            }
            tried[credential.slot()] = true;

            info!("using API {} (attempt {}/{})", credential, attempt + 1, attempts);

            match self.backend.complete(&request, &credential).await {
                Ok(reply) => return Ok(reply),
                Err(err) if err.is_rate_limit() => {
                    last_error = err.to_string();
                    if attempt + 1 < attempts {
                        warn!("API {} is rate limited ({err}); rotating", credential);
                        credential = self.pool.rotate();
                    } else {
                        warn!("API {} is rate limited ({err}); no keys left", credential);
                    }
                }
                Err(err) => {
                    warn!("API {} failed: {err}", credential);
                    return Err(err);
                }
            }
        }

        Err(DispatchError::Exhausted {
            attempts,
            last: last_error,
        })
    }

    fn next_untried(&self, tried: &[bool], from: usize) -> Option<Credential> {
        let len = tried.len();
        (1..len)
            .map(|offset| (from + offset) % len)
            .find(|slot| !tried[*slot])
            .and_then(|slot| self.pool.get(slot))
    }
}
