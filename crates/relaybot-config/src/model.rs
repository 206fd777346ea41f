use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration, read once at startup.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub backend: BackendConfig,
    /// Ordered API keys; the first one is active at startup.
    pub api_keys: Vec<String>,
    pub system_prompt: String,
    pub history: HistoryConfig,
    pub runtime: RuntimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            backend: BackendConfig::default(),
            api_keys: Vec::new(),
            system_prompt: "You are a helpful assistant. Keep answers short and friendly."
                .to_string(),
            history: HistoryConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("telegram", &self.telegram)
            .field("backend", &self.backend)
            .field("api_keys", &format_args!("[{} keys]", self.api_keys.len()))
            .field("system_prompt", &self.system_prompt)
            .field("history", &self.history)
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.bot_token.is_empty() {
            "<unset>"
        } else {
            "[REDACTED]"
        };
        f.debug_struct("TelegramConfig")
            .field("bot_token", &token)
            .finish()
    }
}

/// Completion endpoint and fixed request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub referer: String,
    pub title: String,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "deepseek/deepseek-chat-v3.1:free".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout_secs: 60,
            referer: "https://github.com/telegram-bot".to_string(),
            title: "Telegram AI Bot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Messages kept per conversation (two per turn).
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { window: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound on backend calls in flight across all conversations.
    pub max_concurrent_dispatches: usize,
    /// Seconds a conversation lane may sit idle before its task exits.
    pub lane_idle_secs: u64,
}

impl RuntimeConfig {
    pub fn lane_idle(&self) -> Duration {
        Duration::from_secs(self.lane_idle_secs)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: 32,
            lane_idle_secs: 300,
        }
    }
}
