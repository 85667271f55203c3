#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # fancy-gateway
//!
//! MCP gateway for a PowerExchange device.
//!
//! Listens on `server.host:server.port` (default `0.0.0.0:8000`) and relays
//! authenticated `tools/call` requests to the device at
//! `http://<DEVICE_IP>:<DEVICE_PORT>`. See the library docs for the API
//! surface and [`fancy_gateway::config`] for every setting.

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use fancy_gateway::{router, AppState, Config};

/// MCP gateway for a PowerExchange device.
#[derive(Parser)]
#[command(name = "fancy-gateway", version)]
struct Cli {
    /// Path to TOML config file.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Tracing isn't up yet, so config errors go straight to stderr.
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fancy-gateway: {e}");
            std::process::exit(1);
        }
    };

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    if let Err(e) = run_server(config).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("fancy-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    for name in config.unknown_description_overrides() {
        warn!("Ignoring description override for unknown tool '{name}'");
    }
    match config.safety.max_power {
        Some(max) => info!("Safety ceiling: power capped at {max}"),
        None => info!("Safety ceiling: not set"),
    }
    if let Some(ctx) = &config.tools.context_description {
        info!("Tool descriptions prefixed with context '{ctx}'");
    }

    let listen = config.server.listen_addr();
    let state = AppState::new(config).context("failed to build device HTTP client")?;
    info!("Device URL: {}", state.device.base_url());

    let app = router(state);

    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!("Listening on {listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Goodbye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
                info!("Received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received SIGINT");
    }
}
