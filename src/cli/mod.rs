pub mod args;
pub mod cache;
pub mod sync;

pub use args::{CacheCliArgs, CacheCommand, Cli, CliCommand, RangeArgs, SyncCliArgs, UsersCliArgs};
pub use cache::handle_cache_command;
pub use sync::{handle_sync_command, handle_users_command};
