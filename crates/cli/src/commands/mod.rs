pub mod ls;
pub mod pull;
pub mod push;
pub mod remote;
pub mod rm;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Download an object to a local file
    Pull(pull::PullArgs),
    /// Upload a local file
    Push(push::PushArgs),
    /// List objects under a prefix
    Ls(ls::LsArgs),
    /// Delete an object
    Rm(rm::RmArgs),
    /// Manage configured remotes
    Remote(remote::RemoteArgs),
}
