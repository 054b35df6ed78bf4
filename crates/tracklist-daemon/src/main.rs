mod core;
mod notify;
mod singleton;
#[cfg(test)]
mod testutil;

use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracklist_proto::config::Config;

/// Announces the track currently on air to chat, overlay and tweet scripts.
#[derive(Debug, Parser)]
#[command(name = "tracklist", version)]
struct Args {
    /// Config file (default: ~/.config/tracklist/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the poll interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Override the playlists directory
    #[arg(long)]
    playlists_dir: Option<PathBuf>,

    /// Do not signal other running instances
    #[arg(long)]
    no_singleton: bool,
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let log_path = &config.daemon.log_file;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);
    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tracklist=debug")),
        )
        .init();

    info!("Log file: {:?}", log_path);
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Ctrl+C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler failed: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(secs) = args.interval {
        config.poll.interval_secs = secs;
    }
    if let Some(dir) = args.playlists_dir {
        config.playlists.dir = dir;
    }

    init_logging(&config)?;
    info!(
        "Config loaded from: {:?}",
        args.config.clone().unwrap_or_else(Config::config_path)
    );

    // Listen before the guard runs: a sibling starting at the same moment may
    // SIGINT us too.
    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        stopper.cancel();
    });

    if !args.no_singleton {
        let name = tracklist_proto::platform::process_name();
        let mut table = singleton::SystemProcessTable::new();
        singleton::enforce_singleton(&mut table, &name, std::process::id());
    }

    let mut poll = core::PollLoop::new(&config)?;
    poll.prime()
        .await
        .context("cannot determine the current track")?;

    poll.run(cancel).await;

    info!("Quitting...");
    std::io::stdout().flush()?;
    Ok(())
}
