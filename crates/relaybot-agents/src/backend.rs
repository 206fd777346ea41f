use async_trait::async_trait;
use relaybot_common::ChatMessage;
use relaybot_security::Credential;
use serde::Serialize;

use crate::error::DispatchError;

/// Body of a chat-completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Remote chat-completion endpoint, called with an explicit credential.
///
/// The dispatcher owns key selection and retries; a backend performs exactly
/// one call per `complete` and reports the outcome.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend identifier used in logs (e.g. "openrouter").
    fn backend_id(&self) -> &str;

    /// Send one completion request and return the first choice's text.
    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> Result<String, DispatchError>;
}
