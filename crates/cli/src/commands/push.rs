use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::Invocation;
use crate::config;
use crate::progress;

#[derive(Args)]
pub struct PushArgs {
    /// Remote name or URL (e.g. s3://bucket/prefix)
    remote: String,

    /// Key relative to the remote's prefix
    key: String,

    /// Local file to upload
    source: PathBuf,
}

pub async fn run(ctx: &Invocation, args: PushArgs) -> Result<()> {
    let storage = config::open_storage(&ctx.config_path, &args.remote, &ctx.connection)?;

    let spinner = progress::create_spinner(&format!("Uploading {}...", args.source.display()));
    let result = storage.push(&args.key, &args.source).await;
    spinner.finish_and_clear();

    let bytes = result.with_context(|| {
        format!(
            "failed to push {} to {} as {}",
            args.source.display(),
            storage.url(),
            args.key
        )
    })?;

    info!(key = %args.key, source = %args.source.display(), bytes, "Upload complete");
    println!(
        "Pushed {} ({}) to {}",
        args.source.display(),
        progress::format_bytes(bytes),
        args.key
    );
    Ok(())
}
