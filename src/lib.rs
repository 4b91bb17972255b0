pub mod client;
pub mod config;
pub mod error;
pub mod log;
pub mod providers;
pub mod rate_provider;
pub mod server;
pub mod store;

use anyhow::Result;
use tracing::debug;

pub enum AppCommand {
    Serve,
    Fetch,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Serve => server::run(config).await,
        AppCommand::Fetch => client::run(&config).await,
    }
}
