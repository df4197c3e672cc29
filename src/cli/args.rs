use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(name = "zoomdl")]
#[command(about = "Download Zoom cloud recordings for an account", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config.toml (default: <config dir>/zoomdl/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// List users and recordings, then download new recording files (default)
    Sync(SyncCliArgs),
    /// Print the account's users (cached or fetched)
    Users(UsersCliArgs),
    /// Inspect or clear the local listing caches
    Cache(CacheCliArgs),
    /// Print version information
    Version,
}

/// Settings that can be given on the command line instead of ZOOM_* variables.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct RangeArgs {
    /// Recording year (overrides ZOOM_RECORDING_YEAR)
    #[arg(long)]
    pub year: Option<i32>,
    /// First month to list, 1-12 (overrides ZOOM_RECORDING_MONTH_FROM)
    #[arg(long)]
    pub month_from: Option<u32>,
    /// Month to stop before, exclusive (overrides ZOOM_RECORDING_MONTH_TO)
    #[arg(long)]
    pub month_to: Option<u32>,
    /// Comma-separated user emails to include; empty means everyone
    #[arg(long)]
    pub users: Option<String>,
    /// Directory downloaded recordings are written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Directory holding the listing caches
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

impl From<RangeArgs> for ConfigOverrides {
    fn from(args: RangeArgs) -> Self {
        Self {
            year: args.year,
            month_from: args.month_from,
            month_to: args.month_to,
            users: args.users,
            download_dir: args.output,
            cache_dir: args.cache_dir,
        }
    }
}

#[derive(ClapArgs, Debug, Default)]
pub struct SyncCliArgs {
    #[command(flatten)]
    pub range: RangeArgs,
    /// Ignore cached listings and fetch everything again
    #[arg(long)]
    pub refresh: bool,
    /// Disable the download progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug, Default)]
pub struct UsersCliArgs {
    /// Comma-separated user emails to mark as included
    #[arg(long)]
    pub users: Option<String>,
    /// Directory holding the listing caches
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// Ignore the cached user list and fetch it again
    #[arg(long)]
    pub refresh: bool,
}

impl UsersCliArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            users: self.users.clone(),
            cache_dir: self.cache_dir.clone(),
            ..Default::default()
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct CacheCliArgs {
    /// Directory holding the listing caches
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Summarize cached users and recordings
    Show,
    /// Delete the cached user list and recording index
    Clear,
}
