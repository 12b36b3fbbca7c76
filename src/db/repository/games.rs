//! Game queries, including the compare-and-swap lifecycle write.

use diesel::dsl::max;
use diesel::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::UnitOfWork;
use crate::battle::GameStatus;
use crate::db::{DbError, Game, LifecycleUpdate, NewGame, ReportUpdate, schema};

impl UnitOfWork<'_> {
    /// Gets a game by id.
    #[instrument(skip(self))]
    pub fn game(&mut self, game_id: i32) -> Result<Option<Game>, DbError> {
        let game = schema::games::table
            .find(game_id)
            .select(Game::as_select())
            .first(self.conn())
            .optional()?;
        if game.is_none() {
            debug!(game_id, "Game not found");
        }
        Ok(game)
    }

    /// Inserts a game.
    #[instrument(
        skip(self, game),
        fields(warband_1 = game.warband_1_id(), warband_2 = game.warband_2_id())
    )]
    pub fn insert_game(&mut self, game: &NewGame) -> Result<Game, DbError> {
        let game = diesel::insert_into(schema::games::table)
            .values(game)
            .returning(Game::as_returning())
            .get_result(self.conn())?;
        info!(game_id = game.id(), status = %game.status(), "Game created");
        Ok(game)
    }

    /// Games referencing a warband in either slot whose status is in `statuses`.
    #[instrument(skip(self))]
    pub fn warband_games_with_status(
        &mut self,
        warband_id: i32,
        statuses: &[GameStatus],
    ) -> Result<Vec<Game>, DbError> {
        let statuses: Vec<&'static str> = statuses.iter().map(GameStatus::to_db_string).collect();
        let games = schema::games::table
            .filter(
                schema::games::warband_1_id
                    .eq(warband_id)
                    .or(schema::games::warband_2_id.eq(warband_id)),
            )
            .filter(schema::games::status.eq_any(statuses))
            .select(Game::as_select())
            .load(self.conn())?;
        debug!(warband_id, count = games.len(), "Warband games loaded");
        Ok(games)
    }

    /// Planned games touching any of a player's warbands in a campaign.
    #[instrument(skip(self))]
    pub fn planned_games_for_player(
        &mut self,
        campaign_id: i32,
        player_id: i32,
    ) -> Result<Vec<Game>, DbError> {
        let warband_ids = self.player_warband_ids(campaign_id, player_id)?;
        if warband_ids.is_empty() {
            return Ok(Vec::new());
        }
        let games = schema::games::table
            .filter(schema::games::campaign_id.eq(campaign_id))
            .filter(schema::games::status.eq(GameStatus::Planned.to_db_string()))
            .filter(
                schema::games::warband_1_id
                    .eq_any(warband_ids.clone())
                    .or(schema::games::warband_2_id.eq_any(warband_ids)),
            )
            .select(Game::as_select())
            .load(self.conn())?;
        debug!(player_id, count = games.len(), "Planned games for player loaded");
        Ok(games)
    }

    /// Highest game number a warband has seen in either slot.
    #[instrument(skip(self))]
    pub fn max_game_number(&mut self, warband_id: i32) -> Result<Option<i32>, DbError> {
        let as_first = schema::games::table
            .filter(schema::games::warband_1_id.eq(warband_id))
            .select(max(schema::games::game_number_1))
            .get_result::<Option<i32>>(self.conn())?;
        let as_second = schema::games::table
            .filter(schema::games::warband_2_id.eq(warband_id))
            .select(max(schema::games::game_number_2))
            .get_result::<Option<i32>>(self.conn())?;
        Ok(as_first.max(as_second))
    }

    /// Returns true if the warband already has a game with this number.
    #[instrument(skip(self))]
    pub fn game_number_taken(
        &mut self,
        warband_id: i32,
        game_number: i32,
    ) -> Result<bool, DbError> {
        let count: i64 = schema::games::table
            .filter(
                schema::games::warband_1_id
                    .eq(warband_id)
                    .and(schema::games::game_number_1.eq(game_number))
                    .or(schema::games::warband_2_id
                        .eq(warband_id)
                        .and(schema::games::game_number_2.eq(game_number))),
            )
            .count()
            .get_result(self.conn())?;
        Ok(count > 0)
    }

    /// Writes lifecycle columns if the row is still at `expected_version`.
    ///
    /// Returns false when another writer got there first.
    #[instrument(skip(self, update), fields(next_version = update.version()))]
    pub fn compare_and_swap_lifecycle(
        &mut self,
        game_id: i32,
        expected_version: i32,
        update: &LifecycleUpdate,
    ) -> Result<bool, DbError> {
        let updated = diesel::update(
            schema::games::table
                .filter(schema::games::id.eq(game_id))
                .filter(schema::games::version.eq(expected_version)),
        )
        .set(update)
        .execute(self.conn())?;
        if updated == 0 {
            warn!(game_id, expected_version, "Stale game version");
        }
        Ok(updated == 1)
    }

    /// Writes submitted result columns.
    #[instrument(skip(self, report))]
    pub fn write_report(&mut self, game_id: i32, report: &ReportUpdate) -> Result<(), DbError> {
        diesel::update(schema::games::table.find(game_id))
            .set(report)
            .execute(self.conn())?;
        debug!(game_id, "Result columns written");
        Ok(())
    }

    /// Zeroes victory and glory points for both slots.
    #[instrument(skip(self))]
    pub fn reset_scores(&mut self, game_id: i32) -> Result<(), DbError> {
        diesel::update(schema::games::table.find(game_id))
            .set((
                schema::games::victory_points_1.eq(0),
                schema::games::victory_points_2.eq(0),
                schema::games::glory_points_1.eq(0),
                schema::games::glory_points_2.eq(0),
            ))
            .execute(self.conn())?;
        debug!(game_id, "Scores reset");
        Ok(())
    }

    /// Deletes a game row.
    #[instrument(skip(self))]
    pub fn delete_game(&mut self, game_id: i32) -> Result<(), DbError> {
        diesel::delete(schema::games::table.find(game_id)).execute(self.conn())?;
        info!(game_id, "Game deleted");
        Ok(())
    }

    /// Lists a campaign's games, newest first.
    #[instrument(skip(self))]
    pub fn campaign_games(&mut self, campaign_id: i32) -> Result<Vec<Game>, DbError> {
        let games = schema::games::table
            .filter(schema::games::campaign_id.eq(campaign_id))
            .order(schema::games::id.desc())
            .select(Game::as_select())
            .load(self.conn())?;
        Ok(games)
    }
}
