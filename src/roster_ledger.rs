//! Roster ledger: append-only rosters per warband and warband eligibility.

use derive_getters::Getters;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::CampaignError;
use crate::battle::WarbandStatus;
use crate::db::{
    CampaignRepository, NewRoster, NewWarband, Roster, RosterContents, UnitOfWork, Warband,
};
use crate::identity::Actor;
use crate::roster_file::{CostNames, RosterSummary, parse_roster};

/// A warband together with the roster just written for it.
#[derive(Debug, Clone, Serialize, Getters)]
pub struct RosterSubmission {
    warband: Warband,
    roster: Roster,
}

/// Service layer for roster submissions and warband review.
///
/// Every roster submission, new or corrective, puts the warband back into
/// [`WarbandStatus::Checking`] until an admin reviews it.
#[derive(Debug, Clone)]
pub struct RosterLedger {
    repository: CampaignRepository,
    cost_names: CostNames,
}

impl RosterLedger {
    /// Creates a ledger backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: CampaignRepository, cost_names: CostNames) -> Self {
        info!("Creating RosterLedger");
        Self {
            repository,
            cost_names,
        }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &CampaignRepository {
        &self.repository
    }

    /// Submits a roster upload.
    ///
    /// With `warband_id = None` a new warband is created from the roster's
    /// name and faction, with roster number 1. Otherwise the roster is
    /// appended to the actor's existing warband with the next sequence number.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::MalformedInput`] if the upload cannot be parsed
    /// - [`CampaignError::NotFound`] if the campaign or warband is unknown
    /// - [`CampaignError::Unauthorized`] if the actor is not a member or not the owner
    /// - [`CampaignError::AlreadyExists`] if the actor already has a warband with that name
    /// - [`CampaignError::InvalidState`] if the warband was deleted
    #[instrument(skip(self, payload), fields(player_id = actor.player_id(), len = payload.len()))]
    pub fn apply_roster(
        &self,
        actor: &Actor,
        campaign_id: i32,
        warband_id: Option<i32>,
        payload: String,
    ) -> Result<RosterSubmission, CampaignError> {
        let summary = parse_roster(&payload, &self.cost_names)?;

        self.repository.write(|uow| {
            if uow.campaign(campaign_id)?.is_none() {
                return Err(CampaignError::NotFound(format!("campaign {campaign_id}")));
            }
            if !uow.is_member(campaign_id, *actor.player_id())? {
                warn!(campaign_id, "Roster from non-member");
                return Err(CampaignError::Unauthorized(format!(
                    "player {} is not part of campaign {}",
                    actor.player_id(),
                    campaign_id
                )));
            }

            match warband_id {
                None => Self::found_warband(uow, actor, campaign_id, summary, payload),
                Some(warband_id) => {
                    Self::append_roster(uow, actor, campaign_id, warband_id, summary, payload)
                }
            }
        })
    }

    #[instrument(skip(uow, summary, payload), fields(player_id = actor.player_id()))]
    fn found_warband(
        uow: &mut UnitOfWork<'_>,
        actor: &Actor,
        campaign_id: i32,
        summary: RosterSummary,
        payload: String,
    ) -> Result<RosterSubmission, CampaignError> {
        let player_id = *actor.player_id();
        if uow
            .warband_by_name(campaign_id, player_id, summary.name())?
            .is_some()
        {
            return Err(CampaignError::AlreadyExists(format!(
                "you already have a warband named '{}' in this campaign",
                summary.name()
            )));
        }

        let warband = uow.insert_warband(&NewWarband::new(
            campaign_id,
            player_id,
            summary.name().clone(),
            summary.faction().clone(),
            WarbandStatus::Checking.to_db_string().to_string(),
        ))?;
        let roster = uow.insert_roster(&new_roster(*warband.id(), 1, &summary, payload))?;

        info!(warband_id = warband.id(), "Warband founded with first roster");
        Ok(RosterSubmission { warband, roster })
    }

    #[instrument(skip(uow, summary, payload), fields(player_id = actor.player_id()))]
    fn append_roster(
        uow: &mut UnitOfWork<'_>,
        actor: &Actor,
        campaign_id: i32,
        warband_id: i32,
        summary: RosterSummary,
        payload: String,
    ) -> Result<RosterSubmission, CampaignError> {
        let warband = uow
            .warband(warband_id)?
            .filter(|w| *w.campaign_id() == campaign_id)
            .ok_or_else(|| {
                CampaignError::NotFound(format!("warband {warband_id} in campaign {campaign_id}"))
            })?;
        if warband.player_id() != actor.player_id() {
            return Err(CampaignError::not_your_warband(warband_id));
        }
        require_not_deleted(&warband)?;

        let count = i32::try_from(uow.roster_count(warband_id)?)
            .map_err(|_| CampaignError::InvalidState("roster count overflow".to_string()))?;
        // A removed roster leaves a gap; never reuse a number still in the ledger.
        let highest = uow.max_roster_number(warband_id)?.unwrap_or(0);
        let game_number = count.max(highest) + 1;

        let roster = uow.insert_roster(&new_roster(warband_id, game_number, &summary, payload))?;
        uow.set_warband_status(warband_id, WarbandStatus::Checking)?;
        let warband = uow
            .warband(warband_id)?
            .ok_or_else(|| CampaignError::NotFound(format!("warband {warband_id}")))?;

        info!(warband_id, game_number, "Roster appended, warband awaiting review");
        Ok(RosterSubmission { warband, roster })
    }

    /// Overwrites an existing roster's payload without changing its number.
    ///
    /// Allowed for the warband's owner and for admins of its campaign. The
    /// warband returns to [`WarbandStatus::Checking`]. Rosters of a deleted
    /// warband are frozen; an admin must reinstate the warband first.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::MalformedInput`] if the upload cannot be parsed
    /// - [`CampaignError::NotFound`] if the roster is unknown
    /// - [`CampaignError::Unauthorized`] if the actor is neither owner nor admin
    /// - [`CampaignError::InvalidState`] if the warband was deleted
    #[instrument(skip(self, payload), fields(player_id = actor.player_id()))]
    pub fn replace_roster_payload(
        &self,
        actor: &Actor,
        roster_id: i32,
        payload: String,
    ) -> Result<Roster, CampaignError> {
        let summary = parse_roster(&payload, &self.cost_names)?;

        self.repository.write(|uow| {
            let roster = uow
                .roster(roster_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("roster {roster_id}")))?;
            let warband_id = *roster.warband_id();
            let warband = uow
                .warband(warband_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("warband {warband_id}")))?;
            if warband.player_id() != actor.player_id()
                && !administers(uow, actor, *warband.campaign_id())?
            {
                return Err(CampaignError::not_your_warband(warband_id));
            }
            require_not_deleted(&warband)?;

            let replaced = uow.replace_roster_contents(
                roster_id,
                &RosterContents::new(
                    *summary.model_count(),
                    *summary.cost(),
                    *summary.glory_cost(),
                    payload,
                ),
            )?;
            uow.set_warband_status(*warband.id(), WarbandStatus::Checking)?;
            info!(roster_id, warband_id = warband.id(), "Roster replaced in place");
            Ok(replaced)
        })
    }

    /// Returns the roster with the highest sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::NotFound`] if the warband has no roster.
    #[instrument(skip(self))]
    pub fn latest_roster(&self, warband_id: i32) -> Result<Roster, CampaignError> {
        self.repository.read(|uow| {
            uow.latest_roster(warband_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("roster for warband {warband_id}")))
        })
    }

    /// Returns all rosters of a warband in sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::NotFound`] if the warband is unknown.
    #[instrument(skip(self))]
    pub fn rosters(&self, warband_id: i32) -> Result<Vec<Roster>, CampaignError> {
        self.repository.read(|uow| {
            if uow.warband(warband_id)?.is_none() {
                return Err(CampaignError::NotFound(format!("warband {warband_id}")));
            }
            let rosters = uow.warband_rosters(warband_id)?;
            debug!(warband_id, count = rosters.len(), "Rosters listed");
            Ok(rosters)
        })
    }

    /// Lists a campaign's warbands.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::NotFound`] if the campaign is unknown.
    #[instrument(skip(self))]
    pub fn warbands(&self, campaign_id: i32) -> Result<Vec<Warband>, CampaignError> {
        self.repository.read(|uow| {
            if uow.campaign(campaign_id)?.is_none() {
                return Err(CampaignError::NotFound(format!("campaign {campaign_id}")));
            }
            Ok(uow.campaign_warbands(campaign_id)?)
        })
    }

    /// Sets a warband's status after admin review.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::Unauthorized`] if the actor is not an admin of the
    ///   warband's campaign
    /// - [`CampaignError::NotFound`] if the warband is unknown
    #[instrument(skip(self), fields(player_id = actor.player_id()))]
    pub fn review_warband(
        &self,
        actor: &Actor,
        warband_id: i32,
        status: WarbandStatus,
    ) -> Result<Warband, CampaignError> {
        if !*actor.campaign_admin() && !*actor.super_admin() {
            return Err(CampaignError::admin_only("reviewing a warband"));
        }
        self.repository.write(|uow| {
            let warband = uow
                .warband(warband_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("warband {warband_id}")))?;
            if !administers(uow, actor, *warband.campaign_id())? {
                return Err(CampaignError::admin_only("reviewing a warband"));
            }
            let previous = warband.parse_status()?;
            uow.set_warband_status(warband_id, status)?;
            info!(warband_id, %previous, %status, "Warband reviewed");
            uow.warband(warband_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("warband {warband_id}")))
        })
    }

    /// Removes a roster. Admin override only.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::Unauthorized`] if the actor is not an admin of the
    ///   roster's campaign
    /// - [`CampaignError::NotFound`] if the roster is unknown
    #[instrument(skip(self), fields(player_id = actor.player_id()))]
    pub fn delete_roster(&self, actor: &Actor, roster_id: i32) -> Result<Roster, CampaignError> {
        if !*actor.campaign_admin() && !*actor.super_admin() {
            return Err(CampaignError::admin_only("deleting a roster"));
        }
        self.repository.write(|uow| {
            let roster = uow
                .roster(roster_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("roster {roster_id}")))?;
            let warband_id = *roster.warband_id();
            let warband = uow
                .warband(warband_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("warband {warband_id}")))?;
            if !administers(uow, actor, *warband.campaign_id())? {
                return Err(CampaignError::admin_only("deleting a roster"));
            }
            uow.delete_roster(roster_id)?;
            warn!(roster_id, warband_id = roster.warband_id(), "Roster removed by admin");
            Ok(roster)
        })
    }
}

/// True if `actor` holds admin rights in `campaign_id`.
#[instrument(skip(uow), fields(player_id = actor.player_id()))]
fn administers(
    uow: &mut UnitOfWork<'_>,
    actor: &Actor,
    campaign_id: i32,
) -> Result<bool, CampaignError> {
    let member = *actor.campaign_admin() && uow.is_member(campaign_id, *actor.player_id())?;
    let allowed = actor.administers(member);
    if !allowed && *actor.campaign_admin() {
        warn!(campaign_id, "Campaign admin acting outside their campaign");
    }
    Ok(allowed)
}

#[instrument(skip(warband), fields(warband_id = warband.id()))]
fn require_not_deleted(warband: &Warband) -> Result<(), CampaignError> {
    if warband.parse_status()? == WarbandStatus::Deleted {
        warn!("Roster change on a deleted warband");
        return Err(CampaignError::InvalidState(format!(
            "warband {} has been deleted",
            warband.id()
        )));
    }
    Ok(())
}

#[instrument(skip(summary, payload))]
fn new_roster(
    warband_id: i32,
    game_number: i32,
    summary: &RosterSummary,
    payload: String,
) -> NewRoster {
    NewRoster::new(
        warband_id,
        game_number,
        *summary.model_count(),
        *summary.cost(),
        *summary.glory_cost(),
        payload,
    )
}
