use std::path::{Path, PathBuf};

use relaybot_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

pub const DEFAULT_CONFIG_FILE: &str = "relaybot.yml";

pub const ENV_TELEGRAM_TOKEN: &str = "RELAYBOT_TELEGRAM_TOKEN";
pub const ENV_API_KEYS: &str = "RELAYBOT_API_KEYS";
pub const ENV_MODEL: &str = "RELAYBOT_MODEL";

/// Reads the YAML config file, layers environment overrides on top and
/// validates the result.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path`, or from `relaybot.yml` in the working
    /// directory when no path is given.
    ///
    /// An explicit path must exist; the default file is optional so the bot
    /// can run from environment variables alone.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    AppConfig::default()
                }
            }
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<AppConfig> {
        if contents.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        serde_yaml::from_str(contents).map_err(|e| Error::Config(format!("invalid YAML: {e}")))
    }

    /// Override file values with `RELAYBOT_*` variables resolved by `lookup`.
    pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(ENV_TELEGRAM_TOKEN).filter(|v| !v.trim().is_empty()) {
            config.telegram.bot_token = token.trim().to_string();
        }

        if let Some(keys) = lookup(ENV_API_KEYS) {
            let parsed: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
            if !parsed.is_empty() {
                debug!("{} API keys taken from {ENV_API_KEYS}", parsed.len());
                config.api_keys = parsed;
            }
        }

        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            config.backend.model = model.trim().to_string();
        }
    }

    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.telegram.bot_token.trim().is_empty() {
            return Err(Error::Config(format!(
                "telegram.bot_token is required (or set {ENV_TELEGRAM_TOKEN})"
            )));
        }

        if config.api_keys.is_empty() {
            return Err(Error::Config(format!(
                "at least one entry in api_keys is required (or set {ENV_API_KEYS})"
            )));
        }
        if let Some(pos) = config.api_keys.iter().position(|k| k.trim().is_empty()) {
            return Err(Error::Config(format!("api_keys[{pos}] is blank")));
        }

        let endpoint = url::Url::parse(&config.backend.endpoint).map_err(|e| {
            Error::Config(format!(
                "backend.endpoint '{}' is not a valid URL: {e}",
                config.backend.endpoint
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "backend.endpoint must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }

        if config.backend.model.trim().is_empty() {
            return Err(Error::Config("backend.model must not be empty".into()));
        }
        if config.backend.max_tokens == 0 {
            return Err(Error::Config("backend.max_tokens must be positive".into()));
        }
        if !(0.0..=2.0).contains(&config.backend.temperature) {
            return Err(Error::Config(format!(
                "backend.temperature must be within 0.0..=2.0, got {}",
                config.backend.temperature
            )));
        }
        if config.backend.timeout_secs == 0 {
            return Err(Error::Config("backend.timeout_secs must be positive".into()));
        }

        let window = config.history.window;
        if window < 2 || window % 2 != 0 {
            return Err(Error::Config(format!(
                "history.window must be an even number of at least 2, got {window}"
            )));
        }

        if config.runtime.max_concurrent_dispatches == 0 {
            return Err(Error::Config(
                "runtime.max_concurrent_dispatches must be positive".into(),
            ));
        }
        if config.runtime.lane_idle_secs == 0 {
            return Err(Error::Config("runtime.lane_idle_secs must be positive".into()));
        }

        Ok(())
    }
}
