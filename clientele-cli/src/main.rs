//! Clientele
//!
//! Command line toolkit for Upvest-managed Ethereum wallets: send contract
//! calls through the Clientele API, sign locally built transactions through
//! the General Purpose Signing Interface, and receive signed webhooks.

mod api;
mod commands;
mod config;
mod server;
mod shutdown;
mod state;

use clap::{Parser, Subcommand};
use config::ConfigLoader;
use server::{build_router, run_server};
use shutdown::spawn_shutdown_watch;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Clientele - Upvest wallet transactions and webhooks
#[derive(Parser, Debug)]
#[command(name = "clientele")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "CLIENTELE_CONFIG", default_value = "./clientele.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a contract call as a Clientele "complex" transaction and poll
    /// for its hash
    Complex,

    /// Sign a locally built transaction via GPSI, broadcast it and poll for
    /// its receipt
    Gpsi,

    /// Run the webhook receiver
    Webhook {
        /// Override the listen address (e.g., 0.0.0.0:3000)
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting clientele v{}", env!("CARGO_PKG_VERSION"));

    let listen_override = match &args.command {
        Command::Webhook { listen } => *listen,
        _ => None,
    };
    let config_loader = ConfigLoader::new(&args.config, listen_override);

    let outcome = match args.command {
        Command::Complex => {
            let settings = config_loader.load_complex().inspect_err(|e| {
                tracing::error!("Failed to load configuration: {}", e);
            })?;
            tracing::info!("Configuration loaded from {:?}", args.config);
            commands::complex::run(settings, spawn_shutdown_watch()).await?
        }
        Command::Gpsi => {
            let settings = config_loader.load_gpsi().inspect_err(|e| {
                tracing::error!("Failed to load configuration: {}", e);
            })?;
            tracing::info!("Configuration loaded from {:?}", args.config);
            commands::gpsi::run(settings, spawn_shutdown_watch()).await?
        }
        Command::Webhook { .. } => {
            let settings = config_loader.load_webhook().inspect_err(|e| {
                tracing::error!("Failed to load configuration: {}", e);
            })?;
            tracing::info!("Configuration loaded from {:?}", args.config);

            let router = build_router(AppState::new(settings.secret));
            tracing::info!("Starting HTTP server on {}", settings.listen);
            run_server(router, settings.listen).await?;
            tracing::info!("Server shutdown complete");
            return Ok(ExitCode::SUCCESS);
        }
    };

    tracing::info!(?outcome, "Done");
    Ok(outcome.exit_code())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,clientele=debug,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
