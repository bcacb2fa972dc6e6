//! records-bridge - privileged file service for the patient-records desktop app
//!
//! The rendering process never touches the filesystem itself. It talks to this
//! process over stdin/stdout and may only invoke the fixed set of operations in
//! [`protocol::Request`].

mod filesystem;
mod lifecycle;
mod protocol;
mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use filesystem::config::{BridgeConfig, ExecutionMode};
use filesystem::{path_utils, usage};

#[derive(Parser, Debug)]
#[command(name = "records-bridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Execution mode (defaults to RECORDS_ENV)
    #[arg(long, value_enum, global = true)]
    mode: Option<ExecutionMode>,

    /// Use this storage root instead of resolving one
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the rendering process over stdin/stdout (default)
    Serve,
    /// Print usage of a folder relative to its volume
    FolderInfo { path: String },
    /// Print the resolved storage root
    StorageRoot,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("records_bridge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = BridgeConfig::from_env();
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if cli.storage_root.is_some() {
        config.storage_root = cli.storage_root;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::run(config).await?,
        Command::FolderInfo { path } => {
            let report = usage::folder_info(Some(path.as_str())).await;
            println!("{} {}", "Used: ".cyan(), report.used_space);
            println!("{} {}", "Total:".cyan(), report.total_space);
            println!("{} {}%", "Share:".cyan(), report.percentage);
        }
        Command::StorageRoot => {
            let root = path_utils::resolve_storage_root(&config)?;
            println!("{}", root.display());
        }
    }

    Ok(())
}
