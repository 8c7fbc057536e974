//! Chatloom CLI — the main entry point.
//!
//! Commands:
//! - `init`  — Initialize the config directory and default config
//! - `chat`  — Interactive or single-message chat for a chosen use case
//! - `tools` — Inspect the configured tool servers

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "chatloom",
    about = "Chatloom — use-case driven agent chat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,

    /// Chat with the agent
    Chat {
        /// Use case: basic, tool, news, or mcp
        #[arg(short, long, default_value = "basic")]
        usecase: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Path to a server catalog, replacing the default locations
        #[arg(long)]
        mcp_config: Option<PathBuf>,
    },

    /// List the configured tool servers
    Tools {
        /// Path to a server catalog, replacing the default locations
        #[arg(long)]
        mcp_config: Option<PathBuf>,

        /// Probe whether each tool command can be started
        #[arg(long)]
        probe: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Chat {
            usecase,
            message,
            mcp_config,
        } => commands::chat::run(&usecase, message, mcp_config).await?,
        Commands::Tools { mcp_config, probe } => commands::tools::run(mcp_config, probe).await?,
    }

    Ok(())
}
