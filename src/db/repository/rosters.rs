//! Roster ledger queries.

use diesel::dsl::max;
use diesel::prelude::*;
use tracing::{debug, info, instrument};

use super::UnitOfWork;
use crate::db::{DbError, NewRoster, Roster, RosterContents, schema};

impl UnitOfWork<'_> {
    /// Gets a roster by id.
    #[instrument(skip(self))]
    pub fn roster(&mut self, roster_id: i32) -> Result<Option<Roster>, DbError> {
        let roster = schema::rosters::table
            .find(roster_id)
            .select(Roster::as_select())
            .first(self.conn())
            .optional()?;
        Ok(roster)
    }

    /// Appends a roster.
    #[instrument(
        skip(self, roster),
        fields(warband_id = roster.warband_id(), game_number = roster.game_number())
    )]
    pub fn insert_roster(&mut self, roster: &NewRoster) -> Result<Roster, DbError> {
        let roster = diesel::insert_into(schema::rosters::table)
            .values(roster)
            .returning(Roster::as_returning())
            .get_result(self.conn())?;
        info!(roster_id = roster.id(), game_number = roster.game_number(), "Roster appended");
        Ok(roster)
    }

    /// Counts a warband's rosters.
    #[instrument(skip(self))]
    pub fn roster_count(&mut self, warband_id: i32) -> Result<i64, DbError> {
        let count = schema::rosters::table
            .filter(schema::rosters::warband_id.eq(warband_id))
            .count()
            .get_result(self.conn())?;
        Ok(count)
    }

    /// Highest roster sequence number of a warband.
    #[instrument(skip(self))]
    pub fn max_roster_number(&mut self, warband_id: i32) -> Result<Option<i32>, DbError> {
        let highest = schema::rosters::table
            .filter(schema::rosters::warband_id.eq(warband_id))
            .select(max(schema::rosters::game_number))
            .get_result::<Option<i32>>(self.conn())?;
        Ok(highest)
    }

    /// The roster with the highest sequence number.
    #[instrument(skip(self))]
    pub fn latest_roster(&mut self, warband_id: i32) -> Result<Option<Roster>, DbError> {
        let roster = schema::rosters::table
            .filter(schema::rosters::warband_id.eq(warband_id))
            .order(schema::rosters::game_number.desc())
            .select(Roster::as_select())
            .first(self.conn())
            .optional()?;
        debug!(warband_id, found = roster.is_some(), "Latest roster lookup");
        Ok(roster)
    }

    /// All rosters of a warband in sequence order.
    #[instrument(skip(self))]
    pub fn warband_rosters(&mut self, warband_id: i32) -> Result<Vec<Roster>, DbError> {
        let rosters = schema::rosters::table
            .filter(schema::rosters::warband_id.eq(warband_id))
            .order(schema::rosters::game_number.asc())
            .select(Roster::as_select())
            .load(self.conn())?;
        Ok(rosters)
    }

    /// Overwrites a roster's contents in place.
    #[instrument(skip(self, contents))]
    pub fn replace_roster_contents(
        &mut self,
        roster_id: i32,
        contents: &RosterContents,
    ) -> Result<Roster, DbError> {
        let roster = diesel::update(schema::rosters::table.find(roster_id))
            .set(contents)
            .returning(Roster::as_returning())
            .get_result(self.conn())?;
        info!(roster_id, game_number = roster.game_number(), "Roster contents replaced");
        Ok(roster)
    }

    /// Removes a roster.
    #[instrument(skip(self))]
    pub fn delete_roster(&mut self, roster_id: i32) -> Result<(), DbError> {
        let deleted = diesel::delete(schema::rosters::table.find(roster_id)).execute(self.conn())?;
        if deleted == 0 {
            return Err(DbError::new(format!("Roster {} does not exist", roster_id)));
        }
        info!(roster_id, "Roster deleted");
        Ok(())
    }
}
