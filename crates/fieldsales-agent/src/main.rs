mod commands;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fieldsales_agent::{AgentConfig, Cli, Command};
use fieldsales_logging::FieldSubscriberBuilder;

fn load_config(cli: &Cli) -> anyhow::Result<AgentConfig> {
    // `distance` only needs the branch anchor, which has a default
    let optional = matches!(cli.command, Command::Distance { .. });
    if optional && !cli.config.exists() {
        return Ok(AgentConfig::default());
    }
    AgentConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let mut logging = FieldSubscriberBuilder::new().with_config(config.logging.clone());
    if let Some(level) = &cli.log_level {
        logging = logging.with_level(level.clone());
    }
    let _log_guard = logging.try_init()?;

    let result = match cli.command {
        Command::Run {
            online,
            duration_secs,
        } => commands::run(&config, online, duration_secs.map(Duration::from_secs)).await,
        Command::Distance {
            latitude,
            longitude,
        } => commands::distance(&config, latitude, longitude),
        Command::Toggle { status } => commands::toggle(&config, status.into()).await,
        Command::SyncNow => commands::sync_now(&config).await,
        Command::Profile => commands::profile(&config).await,
    };

    fieldsales_logging::shutdown();
    result
}
