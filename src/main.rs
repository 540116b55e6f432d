//! Intercom server
//!
//! ```text
//!   microphone clients          ┌────────────────────────────────────────┐
//!   ──── TCP ─────────────────▶ │ net::Acceptor ─▶ session::Session (×N)  │
//!                               │                   │                    │
//!                               │      recognition ◀┘└▶ speech           │
//!                               └────────────────────────────────────────┘
//! ```
//!
//! The console takes `exit` to stop; any other line prints the client count.

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use intercom_server::config::{config_warnings, load_config, validate_config, ConfigError, IntercomConfig};
use intercom_server::lifecycle::shutdown_signal;
use intercom_server::observability::{logging, metrics};
use intercom_server::Server;

#[derive(Parser)]
#[command(name = "intercom-server")]
#[command(about = "Voice gateway for embedded microphone clients", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

fn resolve_config(cli: &Cli) -> Result<IntercomConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => IntercomConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.listener.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read console commands until `exit`, Ctrl-C, or end of input.
async fn control_loop(server: &Server) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = shutdown_signal();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => return,
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().eq_ignore_ascii_case("exit") => return,
                Ok(Some(_)) => println!("Active clients: {}", server.client_count()),
                // Detached from a terminal: wait for Ctrl-C only.
                Ok(None) => {
                    (&mut ctrl_c).await;
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Console read failed");
                    (&mut ctrl_c).await;
                    return;
                }
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("intercom-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        max_clients = config.listener.max_clients,
        read_timeout_ms = config.timeouts.read_ms,
        "Configuration loaded"
    );
    for warning in config_warnings(&config) {
        tracing::warn!("{warning}");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = Server::new(config);
    let addr = server.start().await?;
    println!("Listening on {addr}. Type 'exit' to stop, anything else for the client count.");

    control_loop(&server).await;
    server.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
