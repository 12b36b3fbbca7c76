//! Strictly Campaign - Unified CLI
//!
//! Runs the campaign server and a handful of admin commands.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{CampaignAction, Cli, Command, PlayerAction};
use strictly_campaign::{
    AppState, CampaignConfig, CampaignRepository, parse_roster, router,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_campaign=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = CampaignConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Serve { port, host } => run_server(config, host, port).await,
        Command::Migrate => migrate(&config),
        Command::Campaign {
            action: CampaignAction::Create { name },
        } => {
            let campaign = repository(&config)?.create_campaign(name)?;
            println!("{}", serde_json::to_string_pretty(&campaign)?);
            Ok(())
        }
        Command::Player { action } => run_player(&config, action),
        Command::InspectRoster { path } => inspect_roster(&config, &path),
    }
}

/// Run the HTTP campaign server
#[instrument(skip(config))]
async fn run_server(config: CampaignConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = match host {
        Some(host) => config.with_host(host),
        None => config,
    };
    let config = match port {
        Some(port) => config.with_port(port),
        None => config,
    };

    let state = AppState::from_config(&config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(host = %config.host(), port = config.port(), "Server ready");
    axum::serve(listener, app).await?;

    Ok(())
}

fn repository(config: &CampaignConfig) -> Result<CampaignRepository> {
    let repository = CampaignRepository::new(config.database_path().clone())?
        .with_busy_timeout(*config.busy_timeout_ms());
    repository.run_migrations()?;
    Ok(repository)
}

#[instrument(skip(config))]
fn migrate(config: &CampaignConfig) -> Result<()> {
    let repository = CampaignRepository::new(config.database_path().clone())?;
    let applied = repository.run_migrations()?;
    println!("{applied} migration(s) applied to {}", config.database_path());
    Ok(())
}

fn run_player(config: &CampaignConfig, action: PlayerAction) -> Result<()> {
    let repository = repository(config)?;
    match action {
        PlayerAction::Create { name } => {
            let player = repository.create_player(name)?;
            println!("{}", serde_json::to_string_pretty(&player)?);
        }
        PlayerAction::Join { campaign, player } => {
            let membership = repository.join_campaign(campaign, player)?;
            println!("{}", serde_json::to_string_pretty(&membership)?);
        }
    }
    Ok(())
}

#[instrument(skip(config), fields(path = %path.display()))]
fn inspect_roster(config: &CampaignConfig, path: &std::path::Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let summary = parse_roster(&raw, &config.cost_names())?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
