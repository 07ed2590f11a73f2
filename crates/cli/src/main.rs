//! # Ferrous Adblock
//!
//! Keeps filter list subscriptions installed and classifies requests
//! against them.

mod bootstrap;
mod commands;
mod di;

use bootstrap::{init_logging, load_config};
use clap::{Parser, Subcommand};
use commands::{ClassifyArgs, ConfigAction};
use di::AdblockServices;
use ferrous_adblock_domain::CliOverrides;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ferrous-adblock")]
#[command(version)]
#[command(about = "Filter list subscriptions and request classification")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Data directory, overrides `storage.data_dir`
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level, overrides `logging.level`
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keep subscriptions up to date until interrupted
    Run,
    /// Classify one request and print the verdict as JSON
    Classify(ClassifyArgs),
    /// List filtering configurations
    Configs,
    /// Change a filtering configuration
    Config {
        name: String,
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Create an empty filtering configuration
    Create { name: String },
    /// Remove a filtering configuration and its data
    Remove { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        data_dir: cli.data_dir,
        log_level: cli.log_level,
    };
    let config = load_config(cli.config.as_deref(), overrides)?;
    init_logging(&config);

    let services = AdblockServices::new(config)?;

    match cli.command {
        Command::Run => commands::run(&services).await,
        Command::Classify(args) => commands::classify(&services, args).await,
        Command::Configs => commands::list_configurations(&services),
        Command::Config { name, action } => commands::update_configuration(&services, &name, action),
        Command::Create { name } => commands::create_configuration(&services, &name),
        Command::Remove { name } => commands::remove_configuration(&services, &name).await,
    }
}
