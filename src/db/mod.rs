//! Database persistence layer for campaigns, warbands, rosters and games.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{
    Campaign, Game, LifecycleUpdate, Membership, NewCampaign, NewGame, NewMembership, NewPlayer,
    NewRoster, NewWarband, Player, ReportUpdate, Roster, RosterContents, Warband,
};
pub use repository::{CampaignRepository, MIGRATIONS, UnitOfWork};
