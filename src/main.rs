mod cli;
mod config;
mod follow;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use eventtail_log::EventLog;
use eventtail_server::AppState;

use crate::cli::{Args, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = Config::resolve(&args)?;

    match args.command {
        Some(Command::Follow(follow_args)) => follow::run(&config, follow_args).await,
        None => run_server(config).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    let log = EventLog::new(&config.log_path);
    log.ensure_exists()
        .await
        .with_context(|| format!("unable to prepare event log {}", config.log_path.display()))?;

    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("unable to bind {addr}"))?;

    tracing::info!(address = %addr, "event server listening");
    tracing::info!(path = %config.log_path.display(), "event file");
    tracing::info!(path = %config.viewer_path.display(), "viewer");
    tracing::info!("endpoints: GET / | GET /events?offset=N | GET /health | GET /clear");

    let state = AppState::new(log, &config.viewer_path);
    eventtail_server::serve(listener, state, shutdown_signal())
        .await
        .context("event server failed")?;

    tracing::info!("event server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "unable to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal_name = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    tracing::info!(signal = signal_name, "shutting down event server");
}
