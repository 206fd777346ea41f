mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use relaybot_agents::{DispatcherSettings, OpenRouterBackend, OpenRouterConfig, RequestDispatcher};
use relaybot_channels::{ChannelLifecycle, ChannelSender, TelegramChannel};
use relaybot_config::{AppConfig, ConfigLoader};
use relaybot_db::ConversationStore;
use relaybot_gateway::{AppState, ConcurrentHandler};
use relaybot_security::CredentialPool;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Text sent to the backend at startup to check that the keys work.
const PROBE_TEXT: &str = "Hello";

/// Inbound messages buffered between the Telegram poller and the router.
const INBOUND_QUEUE: usize = 256;

#[derive(Parser)]
#[command(name = "relaybot", version, about = "Telegram chat relay with API key rotation")]
struct Cli {
    /// Path to the YAML config file (defaults to ./relaybot.yml if present)
    #[arg(short, long, env = "RELAYBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Send one test completion and exit
    #[arg(long)]
    probe: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    let config =
        ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?;

    let dispatcher = build_dispatcher(&config)?;
    info!(
        "loaded {} API keys, model {}",
        dispatcher.pool().size(),
        config.backend.model
    );

    let probe_ok = probe(&dispatcher).await;
    if cli.probe {
        return if probe_ok {
            Ok(())
        } else {
            anyhow::bail!("backend probe failed")
        };
    }

    run(config, dispatcher).await
}

fn build_dispatcher(config: &AppConfig) -> Result<Arc<RequestDispatcher>> {
    let pool = CredentialPool::new(config.api_keys.clone()).context("invalid api_keys")?;

    let backend = OpenRouterBackend::new(OpenRouterConfig {
        endpoint: config.backend.endpoint.clone(),
        timeout: config.backend.timeout(),
        referer: config.backend.referer.clone(),
        title: config.backend.title.clone(),
    })
    .context("failed to build HTTP client")?;

    let settings = DispatcherSettings {
        model: config.backend.model.clone(),
        system_prompt: config.system_prompt.clone(),
        max_tokens: config.backend.max_tokens,
        temperature: config.backend.temperature,
    };

    Ok(Arc::new(RequestDispatcher::new(
        Arc::new(backend),
        Arc::new(pool),
        settings,
    )))
}

/// One completion with empty history. A failure is logged, not fatal.
async fn probe(dispatcher: &RequestDispatcher) -> bool {
    match dispatcher.dispatch(&[], PROBE_TEXT).await {
        Ok(reply) => {
            let preview: String = reply.chars().take(80).collect();
            info!("backend probe succeeded: {preview}");
            true
        }
        Err(e) => {
            warn!("backend probe failed: {e}");
            false
        }
    }
}

async fn run(config: AppConfig, dispatcher: Arc<RequestDispatcher>) -> Result<()> {
    let (inbound_tx, mut inbound_rx) = mpsc::channel(INBOUND_QUEUE);
    let mut channel = TelegramChannel::new(&config.telegram.bot_token, inbound_tx);
    channel
        .connect()
        .await
        .context("failed to connect to Telegram")?;

    let sender: Arc<dyn ChannelSender> = Arc::from(channel.create_sender());
    let store = Arc::new(ConversationStore::new(config.history.window));
    let state = Arc::new(AppState::new(dispatcher, store, sender));
    let handler = ConcurrentHandler::new(
        state,
        config.runtime.max_concurrent_dispatches,
        config.runtime.lane_idle(),
    );

    info!("relaybot is running, press Ctrl-C to stop");
    loop {
        tokio::select! {
            message = inbound_rx.recv() => match message {
                Some(message) => handler.submit(message),
                None => {
                    warn!("telegram poller stopped");
                    break;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("failed to listen for Ctrl-C: {e}");
                }
                info!("shutting down");
                break;
            }
        }
    }

    channel
        .disconnect()
        .await
        .context("failed to disconnect from Telegram")?;
    Ok(())
}
