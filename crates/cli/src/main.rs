mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ConnectionArgs};

#[derive(Parser)]
#[command(
    name = "stowage",
    version,
    about = "Copy files to and from S3-compatible object storage"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/stowage/stowage.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,
}

/// Per-invocation settings handed to every command.
pub struct Invocation {
    pub config_path: PathBuf,
    pub connection: ConnectionArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let ctx = Invocation {
        config_path: cli.config.unwrap_or_else(AppConfig::default_path),
        connection: cli.connection,
    };

    match cli.command {
        commands::Command::Pull(args) => commands::pull::run(&ctx, args).await,
        commands::Command::Push(args) => commands::push::run(&ctx, args).await,
        commands::Command::Ls(args) => commands::ls::run(&ctx, args).await,
        commands::Command::Rm(args) => commands::rm::run(&ctx, args).await,
        commands::Command::Remote(args) => commands::remote::run(&ctx, args),
    }
}
