//! Strictly Campaign library - battle lifecycle for warband campaigns
//!
//! Players register warbands through roster uploads, pair up for games,
//! confirm readiness and agree on results. Every finished game sends both
//! warbands back for a fresh roster before they may play again.
//!
//! # Architecture
//!
//! - **Battle**: pure state machine for game status, readiness and approvals
//! - **Roster ledger**: append-only roster history and warband eligibility
//! - **Pairing**: proposals with one-open-game-per-warband scheduling rules
//! - **Readiness gate**: planned games become active once both sides are ready
//! - **Approval**: result submission with dual confirmation
//! - **Server**: axum HTTP surface over the services
//!
//! # Example
//!
//! ```no_run
//! use strictly_campaign::{Actor, CampaignConfig, CampaignRepository, ReadinessGate};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = CampaignConfig::load("campaign.toml")?;
//! let repository = CampaignRepository::new(config.database_path().clone())?;
//! repository.run_migrations()?;
//!
//! let gate = ReadinessGate::new(repository, config.retry_policy());
//! let game = gate.mark_ready(&Actor::player(1), 7)?;
//! println!("game {} is {}", game.id(), game.status());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod approval_service;
mod battle;
mod config;
mod db;
mod error;
mod identity;
mod pairing_service;
mod readiness_gate;
mod retry;
mod roster_file;
mod roster_ledger;
mod server;

// Crate-level exports - Errors
pub use error::CampaignError;

// Crate-level exports - Battle lifecycle
pub use battle::{
    Action, Effect, EntryInput, GameStatus, Lifecycle, LifecycleError, NamedEntry, ReportError,
    ResultReport, ResultSubmission, RolledEntry, Side, SideFlags, SideInput, SideReport,
    Transition, WarbandStatus, resolve_side,
};

// Crate-level exports - Configuration
pub use config::{CampaignConfig, ConfigError, DATABASE_URL_ENV};

// Crate-level exports - Database
pub use db::{
    Campaign, CampaignRepository, DbError, Game, Membership, Player, Roster, UnitOfWork, Warband,
};

// Crate-level exports - Identity
pub use identity::{
    Actor, CAMPAIGN_ADMIN_HEADER, GatewayHeaders, IdentityProvider, PLAYER_HEADER,
    SUPER_ADMIN_HEADER,
};

// Crate-level exports - Roster files
pub use roster_file::{CostNames, RosterFileError, RosterSummary, parse_roster};

// Crate-level exports - Services
pub use approval_service::ApprovalService;
pub use pairing_service::{GameProposal, PairingService};
pub use readiness_gate::ReadinessGate;
pub use retry::RetryPolicy;
pub use roster_ledger::{RosterLedger, RosterSubmission};

// Crate-level exports - HTTP server
pub use server::{
    ApiError, AppState, ErrorBody, GameView, PathId, Payload, RosterReplacement, RosterUpload,
    WarbandReview, router, status_for,
};
