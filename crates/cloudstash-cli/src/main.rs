//! Cloudstash CLI - incremental one-way backup into a remote object store
//!
//! Provides commands for:
//! - First-run setup of the configuration and backup list
//! - Running a backup (Ctrl-C cancels cooperatively)
//! - Inspecting the remote tree and trashing remote nodes
//! - Viewing and validating configuration

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cloudstash_core::config::{expand_home, Config};

mod commands;
mod output;

use commands::{
    config::ConfigCommand, init::InitCommand, run::RunCommand, trash::TrashCommand,
    tree::TreeCommand, CommandContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "cloudstash",
    version,
    about = "Incremental one-way backup into a remote object store"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the configuration, backup list and help file
    Init(InitCommand),
    /// Back up every entry of the backup list
    Run(RunCommand),
    /// Print the remote tree
    Tree(TreeCommand),
    /// Move a remote node to the trash
    Trash(TrashCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Picks the log filter: `RUST_LOG`, then `-v`, then `logging.level`
fn env_filter(verbose: u8, config_level: &str) -> EnvFilter {
    let level = match verbose {
        0 => config_level,
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing(verbose: u8, config: &Config) -> Result<()> {
    let filter = env_filter(verbose, &config.logging.level);

    match &config.logging.file {
        Some(file) => {
            let path = expand_home(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(log))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);
    init_tracing(cli.verbose, &config)?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CommandContext::new(format, config_path);

    match cli.command {
        Commands::Init(cmd) => cmd.execute(&ctx).await,
        Commands::Run(cmd) => cmd.execute(&ctx).await,
        Commands::Tree(cmd) => cmd.execute(&ctx).await,
        Commands::Trash(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
