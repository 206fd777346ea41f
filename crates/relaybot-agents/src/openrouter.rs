use std::time::Duration;

use async_trait::async_trait;
use relaybot_common::{Error, Result};
use relaybot_security::Credential;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::debug;

use crate::backend::{CompletionBackend, CompletionRequest};
use crate::error::DispatchError;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Longest response body echoed into debug logs.
const LOGGED_BODY_LIMIT: usize = 512;

/// Connection settings for an OpenAI-compatible completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,
    /// Upper bound for one request, connect through body read.
    pub timeout: Duration,
    /// Sent as `HTTP-Referer`; OpenRouter uses it to attribute traffic.
    pub referer: String,
    /// Sent as `X-Title`.
    pub title: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
            referer: "https://github.com/telegram-bot".to_string(),
            title: "Telegram AI Bot".to_string(),
        }
    }
}

/// OpenRouter (OpenAI-compatible) chat-completions client.
#[derive(Clone)]
pub struct OpenRouterBackend {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterBackend {
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Agent(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    fn backend_id(&self) -> &str {
        "openrouter"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> std::result::Result<String, DispatchError> {
        let body =
            serde_json::to_vec(request).map_err(|e| DispatchError::Encoding(e.to_string()))?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", credential.expose()))
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .body(body)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.network_error(e))?;

        debug!(
            "{} responded with {}: {}",
            credential,
            status.as_u16(),
            truncate(&text, LOGGED_BODY_LIMIT)
        );

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&text)
                && let Some(error) = envelope.error
            {
                return Err(DispatchError::Api {
                    status: status.as_u16(),
                    message: error.message,
                });
            }
            return Err(DispatchError::Http(status.to_string()));
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| DispatchError::Decoding(e.to_string()))?;

        match parsed.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content.unwrap_or_default()),
            None => match parsed.error {
                Some(error) => Err(DispatchError::Api {
                    status: status.as_u16(),
                    message: error.message,
                }),
                None => Err(DispatchError::EmptyResponse),
            },
        }
    }
}

impl OpenRouterBackend {
    fn network_error(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            DispatchError::Network(format!("request timed out after {:?}", self.config.timeout))
        } else {
            DispatchError::Network(err.to_string())
        }
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}
