use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opencode_events::adapters::ReqwestHttpClient;
use opencode_events::cache::SessionCache;
use opencode_events::cli::{
    parse_args, resolve_server_url, usage, version_line, CliCommand, LoggingHandler,
};
use opencode_events::config::EventLoopConfig;
use opencode_events::dispatch::HandlerSet;
use opencode_events::event_loop::EventLoop;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("opencode_events=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let url = match parse_args(std::env::args()) {
        CliCommand::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", usage());
            return Ok(());
        }
        CliCommand::Run { url } => url,
    };

    init_tracing();

    let base = resolve_server_url(url, |name| std::env::var(name).ok())
        .wrap_err("Invalid server address")?;
    let config = EventLoopConfig::from_env().wrap_err("Invalid event loop configuration")?;

    let client = ReqwestHttpClient::from_config(&config)?;

    let cache = Arc::new(SessionCache::new());
    let handlers = HandlerSet::new()
        .with(Arc::new(LoggingHandler))
        .with(cache.clone());

    let events = EventLoop::new(Arc::new(client), Arc::new(handlers), config);
    events.start(base.clone());
    info!(server = %base, "Listening for events, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .wrap_err("Failed to listen for Ctrl-C")?;

    events.stop();
    println!("{}", cache.summary());
    Ok(())
}
