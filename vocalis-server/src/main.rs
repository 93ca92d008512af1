// Vocalis relay server: chat completion plus speech for the avatar UI

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vocalis_server::{create_router, Overrides, Relay, Settings};

const DEFAULT_LOG_FILTER: &str = "vocalis_server=info,vocalis_llm=info,vocalis_spk=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "vocalis-server", version, about = "Relay chat replies and synthesized speech to the avatar UI")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON); defaults to ./vocalis.* when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit JSON log lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let overrides = Overrides {
        host: cli.host,
        port: cli.port,
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;

    let relay = Arc::new(Relay::from_settings(&settings)?);

    if relay.chat_configured() {
        info!("Chat provider ready ({})", settings.chat.model);
    } else {
        error!(
            "Chat API key missing, every /ai request will fail. {}",
            settings.chat.credential_hint()
        );
    }

    let speech = relay.speech_providers();
    if speech.is_empty() {
        warn!("No speech provider configured, replies will be text only");
    } else {
        info!("Speech providers in order: {}", speech.join(" -> "));
    }

    let app = create_router(relay, settings.server.body_limit_bytes);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Relay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(false)).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
