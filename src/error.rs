//! Errors returned by campaign operations.

use diesel::result::DatabaseErrorKind;
use tracing::warn;

use crate::battle::{LifecycleError, ReportError};
use crate::db::DbError;
use crate::roster_file::RosterFileError;

/// Why a campaign operation was refused.
///
/// Every variant carries a human-readable reason. Validation happens before
/// any write, so a refused operation leaves no partial state behind.
#[derive(Debug, Clone, derive_more::Display, derive_more::From)]
pub enum CampaignError {
    /// No identity was presented.
    #[display("Unauthenticated: {}", _0)]
    Unauthenticated(String),

    /// The actor does not control the target or lacks admin rights.
    #[display("Unauthorized: {}", _0)]
    Unauthorized(String),

    /// A referenced record does not exist or is outside the campaign.
    #[display("Not found: {}", _0)]
    NotFound(String),

    /// The entity's current state does not permit the action.
    #[display("Invalid state: {}", _0)]
    InvalidState(String),

    /// A proposal would break a scheduling invariant.
    #[display("Conflicting schedule: {}", _0)]
    ConflictingSchedule(String),

    /// A record with the same identity already exists.
    #[display("Already exists: {}", _0)]
    AlreadyExists(String),

    /// The submitted payload is unusable.
    #[display("Malformed input: {}", _0)]
    MalformedInput(String),

    /// A concurrent writer changed the record; safe to retry.
    #[display("Concurrent update: {}", _0)]
    Conflict(String),

    /// The persistence layer failed.
    #[display("{}", _0)]
    #[from]
    Database(DbError),
}

impl std::error::Error for CampaignError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl CampaignError {
    /// Returns true for failures a caller may retry unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::ConflictingSchedule(_) => "conflicting_schedule",
            Self::AlreadyExists(_) => "already_exists",
            Self::MalformedInput(_) => "malformed_input",
            Self::Conflict(_) => "conflict",
            Self::Database(_) => "database",
        }
    }

    /// The actor controls neither side of the game.
    pub fn not_your_game(game_id: i32) -> Self {
        Self::Unauthorized(format!("not your game: you control neither side of game {game_id}"))
    }

    /// The actor does not own the warband.
    pub fn not_your_warband(warband_id: i32) -> Self {
        Self::Unauthorized(format!(
            "not your warband: warband {warband_id} belongs to another player"
        ))
    }

    /// The action needs campaign admin rights.
    pub fn admin_only(action: &str) -> Self {
        Self::Unauthorized(format!("{action} requires campaign admin rights"))
    }
}

impl From<diesel::result::Error> for CampaignError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                warn!(message = info.message(), "Unique constraint violated");
                Self::AlreadyExists(format!("duplicate record: {}", info.message()))
            }
            other => Self::Database(DbError::from(other)),
        }
    }
}

impl From<LifecycleError> for CampaignError {
    fn from(err: LifecycleError) -> Self {
        Self::InvalidState(err.to_string())
    }
}

impl From<ReportError> for CampaignError {
    fn from(err: ReportError) -> Self {
        Self::MalformedInput(err.to_string())
    }
}

impl From<RosterFileError> for CampaignError {
    fn from(err: RosterFileError) -> Self {
        Self::MalformedInput(err.to_string())
    }
}
