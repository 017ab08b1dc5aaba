//! ==============================================================================
//! main.rs - sensor relay entry point
//! ==============================================================================
//!
//! purpose:
//!     one binary, three roles:
//!     - relay (default): accepts readings on POST /receive-data and pushes
//!       them to every open websocket; serves the browser dashboard
//!     - dashboard: terminal dashboard subscribed to a relay
//!     - producer: simulated sensor node posting readings to a relay
//!
//! architecture:
//!
//!     ┌──────────┐  POST /receive-data  ┌──────────────┐  ws frames  ┌────────────┐
//!     │ producer │ ───────────────────> │    relay     │ ──────────> │ dashboards │
//!     └──────────┘                      │ (port 3000)  │             └────────────┘
//!                                       └──────────────┘
//!
//! ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sensor_relay::{client, config::RelayConfig, logging, producer, server, Relay};
use std::path::PathBuf;

/// Sensor telemetry relay with live dashboards
#[derive(Parser, Debug)]
#[command(name = "sensor-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short = 'p', long = "port", value_name = "PORT", env = "PORT", global = true)]
    port: Option<u16>,

    /// Log level: trace, debug, info, warn, error (overrides config file)
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the relay (default if no command specified)
    Relay {
        /// Directory holding the dashboard's static files
        #[arg(long = "static-dir", value_name = "DIR")]
        static_dir: Option<PathBuf>,
    },

    /// Watch a relay from the terminal
    Dashboard {
        /// Origin the dashboard page would be served from
        #[arg(long, value_name = "URL")]
        origin: Option<String>,
    },

    /// Post synthetic readings to a relay
    Producer {
        /// Base URL of the relay
        #[arg(long = "relay-url", value_name = "URL")]
        relay_url: Option<String>,

        /// Milliseconds between readings
        #[arg(long, value_name = "MS")]
        interval: Option<u64>,

        /// Stop after this many readings
        #[arg(long, value_name = "N")]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, source) = RelayConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    logging::init(&config.logging, cli.log_level.as_deref());
    match &source {
        Some(path) => tracing::info!(path = %path.display(), "config loaded"),
        None => tracing::warn!("no config file found - using defaults"),
    }

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command.unwrap_or(Commands::Relay { static_dir: None }) {
        Commands::Relay { static_dir } => {
            if let Some(dir) = static_dir {
                config.server.static_dir = dir;
            }
            run_relay(config).await
        }
        Commands::Dashboard { origin } => {
            if let Some(origin) = origin {
                config.dashboard.origin = origin;
            }
            config.print_summary();
            client::run(&config.dashboard, shutdown_signal())
                .await
                .context("dashboard session failed")?;
            Ok(())
        }
        Commands::Producer { relay_url, interval, count } => {
            if let Some(url) = relay_url {
                config.producer.relay_url = url;
            }
            if let Some(ms) = interval {
                config.producer.interval_ms = ms;
            }
            if count.is_some() {
                config.producer.count = count;
            }
            config.print_summary();
            producer::run(&config.producer, config.logging.show_sensor_data, shutdown_signal()).await?;
            Ok(())
        }
    }
}

async fn run_relay(config: RelayConfig) -> Result<()> {
    config.print_summary();

    let addr = config.listen_addr();
    let listener = server::bind(&addr).await?;
    tracing::info!(%addr, "server is listening");

    let state = server::AppState::new(Relay::new(), &config);
    server::serve(listener, state, shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
