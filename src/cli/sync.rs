//! CLI handlers for the commands that talk to the Zoom API.
//!
//! Terminal presentation only; the run itself lives in the `sync` module.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::args::{SyncCliArgs, UsersCliArgs};
use crate::config::{Config, ConfigOverrides, Settings};
use crate::sync::{SyncOptions, SyncRunner};
use crate::zoom::ReqwestTransport;

fn load_settings(config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Settings> {
    let config = Config::load(config_path)?;
    let settings = Settings::from_env(config, overrides)?;
    let range = settings.range()?;
    info!(
        "Recording range: {} months {}..{} (exclusive)",
        range.year, range.month_from, range.month_to
    );
    Ok(settings)
}

fn transport_for(settings: &Settings) -> Result<ReqwestTransport> {
    ReqwestTransport::new(settings.http.timeout, settings.http.download_idle_timeout)
}

pub async fn handle_sync_command(config_path: Option<&Path>, args: SyncCliArgs) -> Result<()> {
    let settings = load_settings(config_path, args.range.into())?;
    let transport = transport_for(&settings)?;

    let options = SyncOptions {
        refresh: args.refresh,
        show_progress: !args.no_progress,
        ..Default::default()
    };

    let summary = SyncRunner::new(&settings, &transport)
        .run(&options)
        .await
        .context("Sync failed")?;

    let downloads = &summary.downloads;
    println!(
        "Users: {} listed, {} indexed | Recordings: {}",
        summary.users_listed, summary.users_indexed, summary.recordings
    );
    println!(
        "Files: {} downloaded, {} already present, {} failed, {} audio-only ignored",
        downloads.downloaded, downloads.skipped, downloads.failed, downloads.audio_only
    );
    println!("Saved to: {}", settings.download_dir.display());

    if downloads.failed > 0 {
        eprintln!(
            "{} file(s) could not be downloaded; re-run to retry them.",
            downloads.failed
        );
    }

    Ok(())
}

pub async fn handle_users_command(config_path: Option<&Path>, args: UsersCliArgs) -> Result<()> {
    let config = Config::load(config_path)?;
    let settings = Settings::account_from_env(config, args.overrides())?;
    let transport = transport_for(&settings)?;
    let runner = SyncRunner::new(&settings, &transport);

    let access_token = runner.authenticate().await?;
    let users = runner.users(&access_token, args.refresh).await?;

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("Found {} user(s):\n", users.len());
    for user in &users {
        let marker = if settings.user_filter.allows(user) { "*" } else { " " };
        println!("{} {:<24} {}", marker, user.id, user.email);
    }

    if !settings.user_filter.is_unrestricted() {
        println!("\n* = included by the user filter");
    }

    Ok(())
}
