//! Pairing and scheduling of games between two warbands.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::CampaignError;
use crate::battle::{GameStatus, WarbandStatus};
use crate::db::{CampaignRepository, Game, NewGame, UnitOfWork, Warband};
use crate::identity::Actor;

/// A request to play a game.
///
/// The proposer's warband takes slot 1. Roster ids pin the snapshot the
/// game is played with; when omitted the latest roster is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct GameProposal {
    warband_id: i32,
    opponent_warband_id: i32,
    #[serde(default)]
    roster_id: Option<i32>,
    #[serde(default)]
    opponent_roster_id: Option<i32>,
}

/// Service layer for proposing and cancelling games.
#[derive(Debug, Clone)]
pub struct PairingService {
    repository: CampaignRepository,
}

impl PairingService {
    /// Creates a pairing service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: CampaignRepository) -> Self {
        info!("Creating PairingService");
        Self { repository }
    }

    /// Proposes a game between the actor's warband and an opponent.
    ///
    /// All checks and the insert share one immediate transaction, so two
    /// racing proposals cannot both pass the open-game checks.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::NotFound`] if the campaign, a warband or a roster is unknown
    /// - [`CampaignError::Unauthorized`] if the actor does not own the proposing warband
    /// - [`CampaignError::InvalidState`] if either warband is not active
    /// - [`CampaignError::ConflictingSchedule`] if a warband already has an open
    ///   game, a player already has an open proposal, or a game number is taken
    /// - [`CampaignError::MalformedInput`] if a warband is paired with itself
    #[instrument(skip(self), fields(player_id = actor.player_id()))]
    pub fn propose_game(
        &self,
        actor: &Actor,
        campaign_id: i32,
        proposal: &GameProposal,
    ) -> Result<Game, CampaignError> {
        if proposal.warband_id == proposal.opponent_warband_id {
            return Err(CampaignError::MalformedInput(
                "a warband cannot be paired against itself".to_string(),
            ));
        }

        self.repository.write(|uow| {
            if uow.campaign(campaign_id)?.is_none() {
                return Err(CampaignError::NotFound(format!("campaign {campaign_id}")));
            }

            let mine = campaign_warband(uow, campaign_id, proposal.warband_id)?;
            if mine.player_id() != actor.player_id() {
                return Err(CampaignError::not_your_warband(*mine.id()));
            }
            let theirs = campaign_warband(uow, campaign_id, proposal.opponent_warband_id)?;
            require_active(&mine, "your warband")?;
            require_active(&theirs, "opponent warband")?;

            for warband in [&mine, &theirs] {
                let open = uow.warband_games_with_status(*warband.id(), &GameStatus::OPEN)?;
                if let Some(game) = open.first() {
                    warn!(warband_id = warband.id(), game_id = game.id(), "Warband already busy");
                    return Err(CampaignError::ConflictingSchedule(format!(
                        "warband '{}' already has an open game ({})",
                        warband.name(),
                        game.id()
                    )));
                }
            }

            let mut players = vec![*mine.player_id()];
            if theirs.player_id() != mine.player_id() {
                players.push(*theirs.player_id());
            }
            for player_id in players {
                let planned = uow.planned_games_for_player(campaign_id, player_id)?;
                if let Some(game) = planned.first() {
                    warn!(player_id, game_id = game.id(), "Player already has a proposal");
                    return Err(CampaignError::ConflictingSchedule(format!(
                        "player {player_id} already has an open proposal (game {})",
                        game.id()
                    )));
                }
            }

            let roster_1 = snapshot_roster(uow, &mine, proposal.roster_id)?;
            let roster_2 = snapshot_roster(uow, &theirs, proposal.opponent_roster_id)?;

            let game_number_1 = next_game_number(uow, &mine)?;
            let game_number_2 = next_game_number(uow, &theirs)?;

            let game = uow.insert_game(&NewGame::new(
                campaign_id,
                *mine.id(),
                *theirs.id(),
                Some(roster_1),
                Some(roster_2),
                game_number_1,
                game_number_2,
                GameStatus::Planned.to_db_string().to_string(),
            ))?;
            info!(
                game_id = game.id(),
                warband_1 = mine.id(),
                warband_2 = theirs.id(),
                game_number_1,
                game_number_2,
                "Game proposed"
            );
            Ok(game)
        })
    }

    /// Withdraws a planned game. The row is deleted.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::NotFound`] if the game is unknown
    /// - [`CampaignError::Unauthorized`] if the actor owns neither warband
    /// - [`CampaignError::InvalidState`] if the game is no longer planned
    #[instrument(skip(self), fields(player_id = actor.player_id()))]
    pub fn cancel_game(&self, actor: &Actor, game_id: i32) -> Result<Game, CampaignError> {
        self.repository.write(|uow| {
            let game = uow
                .game(game_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("game {game_id}")))?;
            let (owner_1, owner_2) = slot_owners(uow, &game)?;
            if actor.side_in(owner_1, owner_2).is_none() {
                return Err(CampaignError::not_your_game(game_id));
            }

            game.lifecycle()?.cancel()?;
            uow.delete_game(game_id)?;
            info!(game_id, "Game cancelled");
            Ok(game)
        })
    }

    /// Returns one game.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::NotFound`] if the game is unknown.
    #[instrument(skip(self))]
    pub fn game(&self, game_id: i32) -> Result<Game, CampaignError> {
        self.repository.read(|uow| {
            uow.game(game_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("game {game_id}")))
        })
    }

    /// Lists a campaign's games, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::NotFound`] if the campaign is unknown.
    #[instrument(skip(self))]
    pub fn games(&self, campaign_id: i32) -> Result<Vec<Game>, CampaignError> {
        self.repository.read(|uow| {
            if uow.campaign(campaign_id)?.is_none() {
                return Err(CampaignError::NotFound(format!("campaign {campaign_id}")));
            }
            Ok(uow.campaign_games(campaign_id)?)
        })
    }
}

/// Owners of the warbands in slot 1 and slot 2.
#[instrument(skip(uow, game), fields(game_id = game.id()))]
pub(crate) fn slot_owners(
    uow: &mut UnitOfWork<'_>,
    game: &Game,
) -> Result<(i32, i32), CampaignError> {
    let (warband_1, warband_2) = game.warband_ids();
    let owner = |uow: &mut UnitOfWork<'_>, id: i32| -> Result<i32, CampaignError> {
        uow.warband(id)?
            .map(|w| *w.player_id())
            .ok_or_else(|| CampaignError::NotFound(format!("warband {id}")))
    };
    Ok((owner(uow, warband_1)?, owner(uow, warband_2)?))
}

#[instrument(skip(uow))]
fn campaign_warband(
    uow: &mut UnitOfWork<'_>,
    campaign_id: i32,
    warband_id: i32,
) -> Result<Warband, CampaignError> {
    uow.warband(warband_id)?
        .filter(|w| *w.campaign_id() == campaign_id)
        .ok_or_else(|| {
            CampaignError::NotFound(format!("warband {warband_id} in campaign {campaign_id}"))
        })
}

#[instrument(skip(warband), fields(warband_id = warband.id()))]
fn require_active(warband: &Warband, label: &str) -> Result<(), CampaignError> {
    let status = warband.parse_status()?;
    if status.is_eligible() {
        return Ok(());
    }
    debug!(warband_id = warband.id(), %status, "Warband not eligible");
    let reason = match status {
        WarbandStatus::Checking => "is waiting for roster review",
        WarbandStatus::NeedsUpdate => "needs a new roster before its next game",
        WarbandStatus::Deleted => "has been deleted",
        WarbandStatus::Active => "is active",
    };
    Err(CampaignError::InvalidState(format!(
        "{label} '{}' {reason}",
        warband.name()
    )))
}

#[instrument(skip(uow, warband), fields(warband_id = warband.id()))]
fn snapshot_roster(
    uow: &mut UnitOfWork<'_>,
    warband: &Warband,
    requested: Option<i32>,
) -> Result<i32, CampaignError> {
    let roster = match requested {
        Some(roster_id) => uow
            .roster(roster_id)?
            .filter(|r| r.warband_id() == warband.id())
            .ok_or_else(|| {
                CampaignError::NotFound(format!(
                    "roster {roster_id} of warband {}",
                    warband.id()
                ))
            })?,
        None => uow.latest_roster(*warband.id())?.ok_or_else(|| {
            CampaignError::NotFound(format!("roster for warband {}", warband.id()))
        })?,
    };
    Ok(*roster.id())
}

#[instrument(skip(uow, warband), fields(warband_id = warband.id()))]
fn next_game_number(uow: &mut UnitOfWork<'_>, warband: &Warband) -> Result<i32, CampaignError> {
    let next = uow.max_game_number(*warband.id())?.unwrap_or(0) + 1;
    if uow.game_number_taken(*warband.id(), next)? {
        return Err(CampaignError::ConflictingSchedule(format!(
            "game number {next} already exists for warband '{}'",
            warband.name()
        )));
    }
    Ok(next)
}
