use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

use cli::Cli;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    model::init_tracing(&config.log_filter);
    tracing::debug!("Configuration loaded: {:?}", config);

    cli.run(config).await
}
