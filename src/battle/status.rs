//! Closed status types for warbands and games.
//!
//! Both are stored as text columns. Parsing goes through [`std::str::FromStr`]
//! (derived by strum) so an unknown string is an error, never a silent default.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Eligibility state of a warband.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WarbandStatus {
    /// A roster was submitted and waits for admin review.
    Checking,
    /// Reviewed and eligible to be paired.
    Active,
    /// Played a finished game; a fresh roster is required.
    NeedsUpdate,
    /// Retired by an admin.
    Deleted,
}

impl WarbandStatus {
    /// Converts the status to the string stored in the database.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Active => "active",
            Self::NeedsUpdate => "needs_update",
            Self::Deleted => "deleted",
        }
    }

    /// Returns true if a warband in this state may be paired for a game.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Lifecycle state of a game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameStatus {
    /// Proposed, waiting for both sides to be ready.
    Planned,
    /// Both sides ready; the game is being played.
    Active,
    /// A result was submitted and waits for the other side.
    PendingApproval,
    /// Both sides agreed on the result.
    Finished,
    /// Withdrawn while planned. Cancelled rows are deleted, so this value
    /// only appears as the outcome of a transition.
    Cancelled,
}

impl GameStatus {
    /// Statuses that occupy a warband's single open slot.
    pub const OPEN: [GameStatus; 2] = [GameStatus::Planned, GameStatus::Active];

    /// Converts the status to the string stored in the database.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::PendingApproval => "pending_approval",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true once no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}
