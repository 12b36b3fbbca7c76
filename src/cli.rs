//! Command-line interface for strictly_campaign.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Strictly Campaign - warband campaign tracker
#[derive(Parser, Debug)]
#[command(name = "strictly_campaign")]
#[command(about = "Rosters, pairings and result approval for warband campaigns", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (defaults apply if it is missing)
    #[arg(short, long, global = true, default_value = "campaign.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP campaign server
    Serve {
        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Campaign administration
    Campaign {
        /// Campaign action
        #[command(subcommand)]
        action: CampaignAction,
    },

    /// Player administration
    Player {
        /// Player action
        #[command(subcommand)]
        action: PlayerAction,
    },

    /// Parse a roster export and print its summary
    InspectRoster {
        /// Roster export file
        path: PathBuf,
    },
}

/// Campaign subcommands
#[derive(Subcommand, Debug)]
pub enum CampaignAction {
    /// Create a campaign
    Create {
        /// Campaign name
        name: String,
    },
}

/// Player subcommands
#[derive(Subcommand, Debug)]
pub enum PlayerAction {
    /// Create a player
    Create {
        /// Display name
        name: String,
    },

    /// Add a player to a campaign
    Join {
        /// Player id
        player: i32,

        /// Campaign id
        campaign: i32,
    },
}
