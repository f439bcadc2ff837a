mod cli;
mod commands;
mod config;
mod logging;
mod output;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use timecamp::{ApiClient, CallError, TimeCamp};

use crate::{
    cli::{Cli, Commands},
    config::{CampConfig, TOKEN_ENV},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if matches!(cli.command, Commands::ConfigPath) {
        return commands::config_path();
    }

    let config = CampConfig::load()?;
    logging::init(&config.log_level);

    let token = config.resolve_token(std::env::var(TOKEN_ENV).ok())?;
    let client = ApiClient::builder(&config.api_url)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to create API client")?;
    tracing::debug!(api_url = %config.api_url, "client ready");

    let api = TimeCamp::new(client, token);
    let result = commands::run(cli.command, &api).await;

    if let Err(err) = &result {
        let unauthorized = err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<CallError>())
            .any(CallError::is_unauthorized);
        if unauthorized {
            eprintln!("The API token was rejected; check {}.", TOKEN_ENV);
        }
    }

    result
}
