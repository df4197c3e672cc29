use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use zoomdl::cli::{
    handle_cache_command, handle_sync_command, handle_users_command, Cli, CliCommand,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("zoomdl {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Users(args)) => handle_users_command(config_path, args).await,
        Some(CliCommand::Cache(args)) => handle_cache_command(config_path, args),
        Some(CliCommand::Sync(args)) => handle_sync_command(config_path, args).await,
        None => handle_sync_command(config_path, Default::default()).await,
    }
}
