//! Quartz Session command-line interface.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Quartz desktop session supervisor
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Path to the session profile (defaults to the XDG config location)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the desktop session and supervise its modules
    Start,

    /// Window manager inspection
    #[clap(subcommand)]
    Wm(commands::wm::WmCommand),

    /// Autostart module management
    #[clap(subcommand)]
    Modules(commands::modules::ModulesCommand),

    /// Session environment variable management
    #[clap(subcommand)]
    Env(commands::environment::EnvCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Start => commands::session::start(cli.config.as_deref()).await,
        Commands::Wm(command) => commands::wm::execute(command),
        Commands::Modules(command) => commands::modules::execute(command, cli.config.as_deref()).await,
        Commands::Env(command) => commands::environment::execute(command, cli.config.as_deref()).await,
    }
}
