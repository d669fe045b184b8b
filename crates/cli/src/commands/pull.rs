use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::Invocation;
use crate::config;
use crate::progress;

#[derive(Args)]
pub struct PullArgs {
    /// Remote name or URL (e.g. s3://bucket/prefix)
    remote: String,

    /// Key relative to the remote's prefix
    key: String,

    /// Local file to write
    target: PathBuf,
}

pub async fn run(ctx: &Invocation, args: PullArgs) -> Result<()> {
    let storage = config::open_storage(&ctx.config_path, &args.remote, &ctx.connection)?;

    let spinner = progress::create_spinner(&format!("Downloading {}...", args.key));
    let result = storage.pull(&args.key, &args.target).await;
    spinner.finish_and_clear();

    let bytes = result.with_context(|| {
        format!(
            "failed to pull {} from {} to {}",
            args.key,
            storage.url(),
            args.target.display()
        )
    })?;

    info!(key = %args.key, target = %args.target.display(), bytes, "Download complete");
    println!(
        "Pulled {} ({}) to {}",
        args.key,
        progress::format_bytes(bytes),
        args.target.display()
    );
    Ok(())
}
