use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatrelay::config::RelayConfig;
use chatrelay::conversation::{Assistant, ConversationStore};
use chatrelay::openai::OpenAiClient;
use chatrelay::ratelimit::{spawn_sweeper, SlidingWindowLimiter};
use chatrelay::server::{AppState, HttpServer};
use chatrelay::whatsapp::WhatsAppClient;

#[derive(Parser, Debug)]
#[command(name = "chatrelay", version, about = "WhatsApp chat-completion relay")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

fn init_tracing(config: &RelayConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = RelayConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    init_tracing(&config);

    info!("Starting chatrelay");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    config.validate()?;
    if config.security.webhook_secret.is_none() {
        warn!("No webhook secret configured, signature verification is disabled");
    }
    info!(
        environment = %config.environment,
        bind_addr = %config.server.bind_addr,
        "Configuration loaded"
    );

    let sender = Arc::new(WhatsAppClient::new(&config.whatsapp)?);
    let backend = Arc::new(OpenAiClient::new(&config.openai)?);
    let store =
        ConversationStore::from_config(config.openai.system_prompt.clone(), &config.conversation);
    let assistant = Arc::new(Assistant::from_config(store, backend, &config.openai));

    let limiter = Arc::new(SlidingWindowLimiter::from_config(&config.rate_limiting));
    info!(
        max_requests = limiter.max_requests(),
        window_minutes = limiter.window_minutes(),
        "Rate limiter initialized"
    );

    let sweeper = match config.rate_limiting.sweep_interval_secs {
        0 => None,
        secs => Some(spawn_sweeper(limiter.clone(), Duration::from_secs(secs))),
    };

    let addr = config.server.bind_addr;
    let state = AppState::new(config, limiter, assistant, sender);

    HttpServer::new(addr, state)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("chatrelay stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
