use relaybot_security::RedactingWriter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber. `RUST_LOG` wins over `verbose` when set.
///
/// Output goes to stderr through [`RedactingWriter`], so API keys and the bot
/// token never reach the log even when a library prints them.
pub fn init(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level))
        .add_directive(quiet("hyper=warn"))
        .add_directive(quiet("reqwest=warn"))
        .add_directive(quiet("rustls=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let layer = fmt::layer()
            .with_target(true)
            .with_writer(RedactingWriter::stderr())
            .json();
        registry.with(layer).init();
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(RedactingWriter::stderr());
        registry.with(layer).init();
    }
}

fn quiet(directive: &str) -> Directive {
    directive
        .parse()
        .unwrap_or_else(|_| tracing::Level::WARN.into())
}
