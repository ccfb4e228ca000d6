//! # Sigil Node CLI
//!
//! Command-line interface for Sigil: out-of-band device registration,
//! registry inspection, device-side envelope emission, and the verifier
//! runtime.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

use sigil_core::SigilConfig;

mod commands;

/// CLI structure
#[derive(Parser, Debug)]
#[command(name = "sigil")]
#[command(about = "Sigil - Signed telemetry verification for edge devices")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new device (generates and stores its key pair)
    Register {
        /// Device identifier
        device_id: String,
    },

    /// List registered device ids
    List,

    /// Emit signed telemetry envelopes for a device, one per line on stdout
    Emit {
        /// Device identifier (its private key must exist locally)
        device_id: String,
        /// Readings object as JSON (default: a sequence counter)
        #[arg(long)]
        data: Option<String>,
        /// Number of envelopes to emit (default: run until interrupted)
        #[arg(long)]
        count: Option<u64>,
        /// Seconds between envelopes
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },

    /// Run the verifier: classify envelopes read line-by-line from stdin
    Verify,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match SigilConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Register { device_id } => commands::registry::register(&config, &device_id),
        Commands::List => commands::registry::list(&config),
        Commands::Emit {
            device_id,
            data,
            count,
            interval_secs,
        } => commands::emit::run(&config, &device_id, data.as_deref(), count, interval_secs).await,
        Commands::Verify => commands::verify::run(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}
