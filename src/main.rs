//! HTTP failover proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────┐
//!                      │                FAILOVER PROXY                 │
//!                      │                                               │
//!   Client Request     │  ┌─────────┐    ┌──────────┐    ┌──────────┐  │
//!   ───────────────────┼─▶│  http   │───▶│ failover │───▶│ backend  │──┼──▶ primary
//!                      │  │ server  │    │  router  │    │  proxy   │──┼──▶ secondary
//!                      │  └─────────┘    └────▲─────┘    └──────────┘  │
//!                      │                      │ read                   │
//!                      │                ┌─────┴──────┐                 │
//!                      │                │   shared   │◀── write ──┐    │
//!                      │                │   status   │            │    │
//!                      │                └────────────┘    ┌───────┴──┐ │
//!                      │                                  │  health  │─┼──▶ primary
//!                      │                                  │ monitor  │ │    (HEAD)
//!                      │                                  └──────────┘ │
//!                      └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use failover_proxy::config::{loader, ConfigOverrides};
use failover_proxy::lifecycle::{signals, Shutdown};
use failover_proxy::observability::logging;
use failover_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "failover-proxy", version)]
#[command(about = "HTTP failover proxy with active health checking", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (`host:port`, `:port` or a bare port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Primary backend URL
    #[arg(long)]
    primary: Option<String>,

    /// Secondary backend URL
    #[arg(long)]
    secondary: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("failover-proxy: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let overrides = ConfigOverrides {
        listen: cli.listen,
        primary: cli.primary,
        secondary: cli.secondary,
        log_level: cli.log_level,
    };
    let config = loader::load(cli.config.as_deref(), &overrides)?;

    logging::init_logging(&config.observability);
    tracing::info!("failover-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        primary = %config.backends.primary,
        secondary = %config.backends.secondary,
        check_interval = ?config.health_check.interval(),
        check_timeout = ?config.health_check.timeout(),
        "Configuration loaded"
    );

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::shutdown_on_signal(shutdown));

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
