//! Parley server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (8989)
//! parley-server
//!
//! # Listen on a specific port, with a log file
//! parley-server 4000 --log-file parley.log
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use parley_server::{DEFAULT_MAX_CLIENTS, DEFAULT_PORT, Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Line-oriented TCP chat server
#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(about = "Line-oriented TCP chat server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(value_name = "port", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum concurrent participants
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Path to the banner logo asset
    #[arg(long, default_value = "logo.txt")]
    logo: PathBuf,

    /// Append diagnostic logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().append(true).create(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        },
        None => None,
    };
    tracing_subscriber::registry().with(fmt::layer()).with(file_layer).with(filter).init();

    tracing::info!("Parley server starting");

    let config = ServerConfig {
        port: args.port,
        max_clients: args.max_clients,
        logo_path: args.logo,
    };

    let server = Server::bind(config).await?;
    server.run().await?;

    Ok(())
}
