use anyhow::Result;
use std::path::{Path, PathBuf};

use super::args::{CacheCliArgs, CacheCommand};
use crate::cache::{BlobCache, RECORDINGS_CACHE_KEY, USERS_CACHE_KEY};
use crate::config::{env_keys, Config};
use crate::zoom::{RecordingIndex, User};

/// Cache directory from the flag, then ZOOM_CACHE_DIR, then the config file.
fn resolve_cache_dir(config_path: Option<&Path>, flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var(env_keys::CACHE_DIR)
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        return Ok(PathBuf::from(dir));
    }
    Ok(Config::load(config_path)?.storage.cache_dir)
}

pub fn handle_cache_command(config_path: Option<&Path>, args: CacheCliArgs) -> Result<()> {
    let cache = BlobCache::new(resolve_cache_dir(config_path, args.cache_dir)?);

    match args.command {
        CacheCommand::Show => show(&cache),
        CacheCommand::Clear => clear(&cache),
    }
}

fn show(cache: &BlobCache) -> Result<()> {
    match cache.load::<Vec<User>>(USERS_CACHE_KEY)? {
        Some(users) => {
            let created = cache
                .inspect(USERS_CACHE_KEY)?
                .and_then(|info| info.created_at)
                .unwrap_or_else(|| "unknown".to_string());
            println!("Users: {} (cached {})", users.len(), created);
        }
        None => println!("Users: not cached"),
    }

    match cache.load::<RecordingIndex>(RECORDINGS_CACHE_KEY)? {
        Some(index) => {
            println!(
                "Recordings: {} across {} users, {} files",
                index.recording_count(),
                index.user_count(),
                index.file_count()
            );
            for entry in &index.users {
                println!("  {:<24} {}", entry.user_id, entry.recordings.len());
            }
        }
        None => println!("Recordings: not cached"),
    }

    println!("Cache directory: {}", cache.dir().display());
    Ok(())
}

fn clear(cache: &BlobCache) -> Result<()> {
    let mut removed = 0;
    for key in [USERS_CACHE_KEY, RECORDINGS_CACHE_KEY] {
        if cache.remove(key)? {
            println!("Removed {}", cache.path_for(key).display());
            removed += 1;
        }
    }
    if removed == 0 {
        println!("Nothing to clear in {}", cache.dir().display());
    }
    Ok(())
}
