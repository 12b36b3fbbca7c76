//! Database models and domain conversions.

use std::str::FromStr;

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::Serialize;
use tracing::instrument;

use crate::battle::{
    GameStatus, Lifecycle, NamedEntry, ResultReport, RolledEntry, SideFlags, SideReport,
    WarbandStatus,
};
use crate::db::{DbError, schema};

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Campaign database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::campaigns)]
pub struct Campaign {
    id: i32,
    name: String,
    created_at: NaiveDateTime,
}

/// Insertable campaign.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::campaigns)]
pub struct NewCampaign {
    name: String,
}

/// Player database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::players)]
pub struct Player {
    id: i32,
    display_name: String,
    created_at: NaiveDateTime,
}

/// Insertable player.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::players)]
pub struct NewPlayer {
    display_name: String,
}

/// A player's membership in a campaign.
#[derive(Debug, Clone, Queryable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::campaign_players)]
pub struct Membership {
    campaign_id: i32,
    player_id: i32,
    joined_at: NaiveDateTime,
}

/// Insertable membership.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::campaign_players)]
pub struct NewMembership {
    campaign_id: i32,
    player_id: i32,
}

/// Warband database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::warbands)]
pub struct Warband {
    id: i32,
    campaign_id: i32,
    player_id: i32,
    name: String,
    faction: Option<String>,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl Warband {
    /// Parses the stored status string into a [`WarbandStatus`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored value is not a known status.
    #[instrument(skip(self), fields(warband_id = self.id, status = %self.status))]
    pub fn parse_status(&self) -> Result<WarbandStatus, DbError> {
        WarbandStatus::from_str(&self.status)
            .map_err(|_| DbError::new(format!("Invalid warband status: '{}'", self.status)))
    }
}

/// Insertable warband.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::warbands)]
pub struct NewWarband {
    campaign_id: i32,
    player_id: i32,
    name: String,
    faction: Option<String>,
    status: String,
}

/// Roster database model. One versioned snapshot of a warband.
#[derive(
    Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters, Serialize,
)]
#[diesel(table_name = schema::rosters)]
#[diesel(belongs_to(Warband))]
pub struct Roster {
    id: i32,
    warband_id: i32,
    game_number: i32,
    model_count: i32,
    cost: i32,
    glory_cost: i32,
    payload: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable roster.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::rosters)]
pub struct NewRoster {
    warband_id: i32,
    game_number: i32,
    model_count: i32,
    cost: i32,
    glory_cost: i32,
    payload: String,
}

/// In-place replacement of a roster's contents. The sequence number is kept.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::rosters)]
pub struct RosterContents {
    model_count: i32,
    cost: i32,
    glory_cost: i32,
    payload: String,
    updated_at: NaiveDateTime,
}

impl RosterContents {
    /// Creates a replacement stamped with the current time.
    pub fn new(model_count: i32, cost: i32, glory_cost: i32, payload: String) -> Self {
        Self {
            model_count,
            cost,
            glory_cost,
            payload,
            updated_at: now(),
        }
    }
}

/// Game database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
pub struct Game {
    id: i32,
    campaign_id: i32,
    warband_1_id: i32,
    warband_2_id: i32,
    roster_1_id: Option<i32>,
    roster_2_id: Option<i32>,
    game_number_1: i32,
    game_number_2: i32,
    status: String,
    ready_1: bool,
    ready_2: bool,
    approved_1: bool,
    approved_2: bool,
    victory_points_1: i32,
    victory_points_2: i32,
    glory_points_1: i32,
    glory_points_2: i32,
    reinforcement_1: bool,
    reinforcement_2: bool,
    injuries_1: String,
    injuries_2: String,
    skills_1: String,
    skills_2: String,
    elites_1: String,
    elites_2: String,
    exploration_dice_1: Option<i32>,
    exploration_dice_2: Option<i32>,
    submitted_by: Option<i32>,
    version: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl Game {
    /// Parses the stored status string into a [`GameStatus`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored value is not a known status.
    #[instrument(skip(self), fields(game_id = self.id, status = %self.status))]
    pub fn parse_status(&self) -> Result<GameStatus, DbError> {
        GameStatus::from_str(&self.status)
            .map_err(|_| DbError::new(format!("Invalid game status: '{}'", self.status)))
    }

    /// Returns the state-machine view of this game.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored status is invalid.
    #[instrument(skip(self), fields(game_id = self.id))]
    pub fn lifecycle(&self) -> Result<Lifecycle, DbError> {
        Ok(Lifecycle {
            status: self.parse_status()?,
            readiness: SideFlags::new(self.ready_1, self.ready_2),
            approvals: SideFlags::new(self.approved_1, self.approved_2),
        })
    }

    /// Returns the warband ids in slot order.
    pub fn warband_ids(&self) -> (i32, i32) {
        (self.warband_1_id, self.warband_2_id)
    }

    /// Decodes the stored result data for both slots.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a stored list is not valid JSON.
    #[instrument(skip(self), fields(game_id = self.id))]
    pub fn report(&self) -> Result<ResultReport, DbError> {
        let side_1 = SideReport::from_parts(
            self.victory_points_1,
            self.glory_points_1,
            self.reinforcement_1,
            serde_json::from_str::<Vec<RolledEntry>>(&self.injuries_1)?,
            serde_json::from_str::<Vec<RolledEntry>>(&self.skills_1)?,
            serde_json::from_str::<Vec<NamedEntry>>(&self.elites_1)?,
            self.exploration_dice_1,
        );
        let side_2 = SideReport::from_parts(
            self.victory_points_2,
            self.glory_points_2,
            self.reinforcement_2,
            serde_json::from_str::<Vec<RolledEntry>>(&self.injuries_2)?,
            serde_json::from_str::<Vec<RolledEntry>>(&self.skills_2)?,
            serde_json::from_str::<Vec<NamedEntry>>(&self.elites_2)?,
            self.exploration_dice_2,
        );
        Ok(ResultReport::new(side_1, side_2))
    }
}

/// Insertable game.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::games)]
pub struct NewGame {
    campaign_id: i32,
    warband_1_id: i32,
    warband_2_id: i32,
    roster_1_id: Option<i32>,
    roster_2_id: Option<i32>,
    game_number_1: i32,
    game_number_2: i32,
    status: String,
}

/// Lifecycle columns written by a compare-and-swap update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::games)]
pub struct LifecycleUpdate {
    status: String,
    ready_1: bool,
    ready_2: bool,
    approved_1: bool,
    approved_2: bool,
    version: i32,
    updated_at: NaiveDateTime,
}

impl LifecycleUpdate {
    /// Builds the update for `lifecycle`, stamping the next `version`.
    pub fn new(lifecycle: &Lifecycle, version: i32) -> Self {
        Self {
            status: lifecycle.status.to_db_string().to_string(),
            ready_1: lifecycle.readiness.slot_1,
            ready_2: lifecycle.readiness.slot_2,
            approved_1: lifecycle.approvals.slot_1,
            approved_2: lifecycle.approvals.slot_2,
            version,
            updated_at: now(),
        }
    }

    /// The version this update writes.
    pub fn version(&self) -> i32 {
        self.version
    }
}

/// Result columns written on submission.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::games, treat_none_as_null = true)]
pub struct ReportUpdate {
    victory_points_1: i32,
    victory_points_2: i32,
    glory_points_1: i32,
    glory_points_2: i32,
    reinforcement_1: bool,
    reinforcement_2: bool,
    injuries_1: String,
    injuries_2: String,
    skills_1: String,
    skills_2: String,
    elites_1: String,
    elites_2: String,
    exploration_dice_1: Option<i32>,
    exploration_dice_2: Option<i32>,
    submitted_by: Option<i32>,
}

impl ReportUpdate {
    /// Serializes `report` into column values.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a list cannot be encoded.
    #[instrument(skip(report))]
    pub fn new(report: &ResultReport, submitted_by: i32) -> Result<Self, DbError> {
        let (one, two) = (report.side_1(), report.side_2());
        Ok(Self {
            victory_points_1: *one.victory_points(),
            victory_points_2: *two.victory_points(),
            glory_points_1: *one.glory_points(),
            glory_points_2: *two.glory_points(),
            reinforcement_1: *one.reinforcement(),
            reinforcement_2: *two.reinforcement(),
            injuries_1: serde_json::to_string(one.injuries())?,
            injuries_2: serde_json::to_string(two.injuries())?,
            skills_1: serde_json::to_string(one.skills())?,
            skills_2: serde_json::to_string(two.skills())?,
            elites_1: serde_json::to_string(one.elites())?,
            elites_2: serde_json::to_string(two.elites())?,
            exploration_dice_1: *one.exploration_dice(),
            exploration_dice_2: *two.exploration_dice(),
            submitted_by: Some(submitted_by),
        })
    }
}
