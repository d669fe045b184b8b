use anyhow::Result;
use clap::{Args, Subcommand};

use stowage_core::Location;

use crate::Invocation;
use crate::config::{AppConfig, RemoteConfig};

#[derive(Args)]
pub struct RemoteArgs {
    #[command(subcommand)]
    action: RemoteAction,
}

#[derive(Subcommand)]
enum RemoteAction {
    /// Add a new remote
    Add {
        /// Remote name
        #[arg(long)]
        name: String,
        /// Storage URL, e.g. s3://bucket/prefix or file:///var/backups
        #[arg(long)]
        url: String,
        /// Access key ID (default: AWS credential chain)
        #[arg(long)]
        access_key_id: Option<String>,
        /// Secret access key (default: AWS credential chain)
        #[arg(long)]
        secret_access_key: Option<String>,
    },
    /// List configured remotes
    List,
    /// Remove a remote
    Remove {
        /// Remote name to remove
        name: String,
    },
}

pub fn run(ctx: &Invocation, args: RemoteArgs) -> Result<()> {
    let path = &ctx.config_path;
    match args.action {
        RemoteAction::Add {
            name,
            url,
            access_key_id,
            secret_access_key,
        } => {
            Location::parse(&url)?;
            if access_key_id.is_some() != secret_access_key.is_some() {
                anyhow::bail!("--access-key-id and --secret-access-key must be given together");
            }
            let mut config = AppConfig::load_or_default(path)?;
            if config.find_remote(&name).is_some() {
                anyhow::bail!("remote '{name}' already exists");
            }
            config.remotes.push(RemoteConfig {
                name: name.clone(),
                url,
                region: ctx.connection.region.clone(),
                endpoint: ctx.connection.endpoint.clone(),
                path_style: ctx.connection.path_style,
                access_key_id,
                secret_access_key,
            });
            config.save(path)?;
            println!("Remote '{name}' added to {}.", path.display());
        }
        RemoteAction::List => {
            let config = AppConfig::load_or_default(path)?;
            if config.remotes.is_empty() {
                println!("No remotes configured.");
            } else {
                println!("{:<20} {:<40} {:<30}", "NAME", "URL", "ENDPOINT");
                println!("{}", "-".repeat(90));
                for r in &config.remotes {
                    println!(
                        "{:<20} {:<40} {:<30}",
                        r.name,
                        r.url,
                        r.endpoint.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        RemoteAction::Remove { name } => {
            let mut config = AppConfig::load(path)?;
            let before = config.remotes.len();
            config
                .remotes
                .retain(|r| !r.name.eq_ignore_ascii_case(&name));
            if config.remotes.len() == before {
                anyhow::bail!("remote '{name}' not found");
            }
            config.save(path)?;
            println!("Remote '{name}' removed.");
        }
    }
    Ok(())
}
