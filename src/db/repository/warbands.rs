//! Warband queries.

use chrono::Utc;
use diesel::prelude::*;
use tracing::{debug, info, instrument};

use super::UnitOfWork;
use crate::battle::WarbandStatus;
use crate::db::{DbError, NewWarband, Warband, schema};

impl UnitOfWork<'_> {
    /// Gets a warband by id.
    #[instrument(skip(self))]
    pub fn warband(&mut self, warband_id: i32) -> Result<Option<Warband>, DbError> {
        let warband = schema::warbands::table
            .find(warband_id)
            .select(Warband::as_select())
            .first(self.conn())
            .optional()?;
        if warband.is_none() {
            debug!(warband_id, "Warband not found");
        }
        Ok(warband)
    }

    /// Gets a player's warband by display name within a campaign.
    #[instrument(skip(self))]
    pub fn warband_by_name(
        &mut self,
        campaign_id: i32,
        player_id: i32,
        name: &str,
    ) -> Result<Option<Warband>, DbError> {
        let warband = schema::warbands::table
            .filter(schema::warbands::campaign_id.eq(campaign_id))
            .filter(schema::warbands::player_id.eq(player_id))
            .filter(schema::warbands::name.eq(name))
            .select(Warband::as_select())
            .first(self.conn())
            .optional()?;
        Ok(warband)
    }

    /// Inserts a warband.
    #[instrument(skip(self, warband), fields(name = %warband.name()))]
    pub fn insert_warband(&mut self, warband: &NewWarband) -> Result<Warband, DbError> {
        let warband = diesel::insert_into(schema::warbands::table)
            .values(warband)
            .returning(Warband::as_returning())
            .get_result(self.conn())?;
        info!(warband_id = warband.id(), player_id = warband.player_id(), "Warband created");
        Ok(warband)
    }

    /// Sets a warband's status.
    #[instrument(skip(self))]
    pub fn set_warband_status(
        &mut self,
        warband_id: i32,
        status: WarbandStatus,
    ) -> Result<(), DbError> {
        let updated = diesel::update(schema::warbands::table.find(warband_id))
            .set((
                schema::warbands::status.eq(status.to_db_string()),
                schema::warbands::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(self.conn())?;
        if updated == 0 {
            return Err(DbError::new(format!("Warband {} does not exist", warband_id)));
        }
        info!(warband_id, %status, "Warband status set");
        Ok(())
    }

    /// Ids of the warbands a player owns in a campaign.
    #[instrument(skip(self))]
    pub fn player_warband_ids(
        &mut self,
        campaign_id: i32,
        player_id: i32,
    ) -> Result<Vec<i32>, DbError> {
        let ids = schema::warbands::table
            .filter(schema::warbands::campaign_id.eq(campaign_id))
            .filter(schema::warbands::player_id.eq(player_id))
            .select(schema::warbands::id)
            .load::<i32>(self.conn())?;
        debug!(count = ids.len(), "Player warbands loaded");
        Ok(ids)
    }

    /// Lists a campaign's warbands, ordered by name.
    #[instrument(skip(self))]
    pub fn campaign_warbands(&mut self, campaign_id: i32) -> Result<Vec<Warband>, DbError> {
        let warbands = schema::warbands::table
            .filter(schema::warbands::campaign_id.eq(campaign_id))
            .order(schema::warbands::name.asc())
            .select(Warband::as_select())
            .load(self.conn())?;
        Ok(warbands)
    }
}
