//! Readiness gate: promotes a planned game to active once both sides are ready.

use tracing::{debug, info, instrument};

use crate::CampaignError;
use crate::battle::{Effect, Side};
use crate::db::{CampaignRepository, Game, LifecycleUpdate};
use crate::identity::Actor;
use crate::pairing_service::slot_owners;
use crate::retry::RetryPolicy;

/// Service layer for readiness.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    repository: CampaignRepository,
    retry: RetryPolicy,
}

impl ReadinessGate {
    /// Creates a readiness gate backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: CampaignRepository, retry: RetryPolicy) -> Self {
        info!("Creating ReadinessGate");
        Self { repository, retry }
    }

    /// Marks the actor's side of a planned game as ready.
    ///
    /// A player who owns both warbands readies both sides at once. When both
    /// sides are ready the game becomes active. Marking an already-ready side
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::NotFound`] if the game is unknown
    /// - [`CampaignError::Unauthorized`] if the actor controls neither side
    /// - [`CampaignError::InvalidState`] if the game is not planned
    /// - [`CampaignError::Conflict`] if concurrent updates outlast the retry policy
    #[instrument(skip(self), fields(player_id = actor.player_id()))]
    pub fn mark_ready(&self, actor: &Actor, game_id: i32) -> Result<Game, CampaignError> {
        self.retry
            .run("mark_ready", |attempt| self.try_mark_ready(actor, game_id, attempt))
    }

    fn try_mark_ready(
        &self,
        actor: &Actor,
        game_id: i32,
        attempt: u32,
    ) -> Result<Game, CampaignError> {
        let (game, side) = self
            .repository
            .read(|uow| -> Result<(Game, Side), CampaignError> {
                let game = uow
                    .game(game_id)?
                    .ok_or_else(|| CampaignError::NotFound(format!("game {game_id}")))?;
                let (owner_1, owner_2) = slot_owners(uow, &game)?;
                let side = actor
                    .side_in(owner_1, owner_2)
                    .ok_or_else(|| CampaignError::not_your_game(game_id))?;
                Ok((game, side))
            })?;

        let current = game.lifecycle()?;
        let transition = current.mark_ready(side)?;
        if transition.lifecycle == current {
            debug!(game_id, %side, "Side already ready");
            return Ok(game);
        }

        let update = LifecycleUpdate::new(&transition.lifecycle, game.version() + 1);
        self.repository.write(|uow| {
            if !uow.compare_and_swap_lifecycle(game_id, *game.version(), &update)? {
                return Err(CampaignError::Conflict(format!(
                    "game {game_id} changed while marking ready (attempt {attempt})"
                )));
            }
            if transition.effect == Effect::Activated {
                info!(game_id, "Both sides ready, game active");
            } else {
                info!(game_id, %side, "Side marked ready");
            }
            uow.game(game_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("game {game_id}")))
        })
    }
}
