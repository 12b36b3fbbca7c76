//! Campaign, player and membership queries.

use diesel::prelude::*;
use tracing::{debug, info, instrument};

use super::UnitOfWork;
use crate::db::{
    Campaign, DbError, Membership, NewCampaign, NewMembership, NewPlayer, Player, schema,
};

impl UnitOfWork<'_> {
    /// Inserts a campaign.
    #[instrument(skip(self))]
    pub fn insert_campaign(&mut self, name: String) -> Result<Campaign, DbError> {
        let campaign = diesel::insert_into(schema::campaigns::table)
            .values(&NewCampaign::new(name))
            .returning(Campaign::as_returning())
            .get_result(self.conn())?;
        info!(campaign_id = campaign.id(), name = %campaign.name(), "Campaign created");
        Ok(campaign)
    }

    /// Gets a campaign by id.
    #[instrument(skip(self))]
    pub fn campaign(&mut self, campaign_id: i32) -> Result<Option<Campaign>, DbError> {
        let campaign = schema::campaigns::table
            .find(campaign_id)
            .select(Campaign::as_select())
            .first(self.conn())
            .optional()?;
        Ok(campaign)
    }

    /// Inserts a player.
    #[instrument(skip(self))]
    pub fn insert_player(&mut self, display_name: String) -> Result<Player, DbError> {
        let player = diesel::insert_into(schema::players::table)
            .values(&NewPlayer::new(display_name))
            .returning(Player::as_returning())
            .get_result(self.conn())?;
        info!(player_id = player.id(), display_name = %player.display_name(), "Player created");
        Ok(player)
    }

    /// Adds a player to a campaign.
    #[instrument(skip(self))]
    pub fn add_member(&mut self, campaign_id: i32, player_id: i32) -> Result<Membership, DbError> {
        let membership = diesel::insert_into(schema::campaign_players::table)
            .values(&NewMembership::new(campaign_id, player_id))
            .returning(Membership::as_returning())
            .get_result(self.conn())?;
        info!(campaign_id, player_id, "Player joined campaign");
        Ok(membership)
    }

    /// Returns true if the player belongs to the campaign.
    #[instrument(skip(self))]
    pub fn is_member(&mut self, campaign_id: i32, player_id: i32) -> Result<bool, DbError> {
        let count: i64 = schema::campaign_players::table
            .filter(schema::campaign_players::campaign_id.eq(campaign_id))
            .filter(schema::campaign_players::player_id.eq(player_id))
            .count()
            .get_result(self.conn())?;
        debug!(campaign_id, player_id, member = count > 0, "Checked membership");
        Ok(count > 0)
    }
}
