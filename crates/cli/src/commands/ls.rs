use anyhow::{Context, Result};
use clap::Args;

use stowage_core::ObjectInfo;

use crate::Invocation;
use crate::config;
use crate::progress::format_bytes;

#[derive(Args)]
pub struct LsArgs {
    /// Remote name or URL (e.g. s3://bucket)
    remote: String,

    /// Key prefix, matched from the bucket root
    #[arg(default_value = "")]
    prefix: String,

    /// Print entries as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(ctx: &Invocation, args: LsArgs) -> Result<()> {
    let storage = config::open_storage(&ctx.config_path, &args.remote, &ctx.connection)?;
    let objects = storage
        .read_dir(&args.prefix)
        .await
        .with_context(|| format!("failed to list {} under '{}'", storage.url(), args.prefix))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(());
    }

    if objects.is_empty() {
        println!("No objects found.");
        return Ok(());
    }

    println!("{:<20} {:>10}  {}", "MODIFIED", "SIZE", "NAME");
    println!("{}", "-".repeat(60));
    for object in &objects {
        println!("{}", format_row(object));
    }
    let total: u64 = objects.iter().map(|o| o.size).sum();
    println!("\n{} objects, {}", objects.len(), format_bytes(total));
    Ok(())
}

fn format_row(object: &ObjectInfo) -> String {
    let modified = object
        .last_modified
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<20} {:>10}  {}",
        modified,
        format_bytes(object.size),
        object.name
    )
}
