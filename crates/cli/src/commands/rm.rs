use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Confirm;

use crate::Invocation;
use crate::config;

#[derive(Args)]
pub struct RmArgs {
    /// Remote name or URL (e.g. s3://bucket)
    remote: String,

    /// Full object key, as shown by `ls`
    key: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

pub async fn run(ctx: &Invocation, args: RmArgs) -> Result<()> {
    let storage = config::open_storage(&ctx.config_path, &args.remote, &ctx.connection)?;

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} from {}?", args.key, storage.url()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    storage
        .remove(&args.key)
        .await
        .with_context(|| format!("failed to remove {} from {}", args.key, storage.url()))?;
    println!("Removed {}", args.key);
    Ok(())
}
