//! Result submission and the dual-confirmation approval protocol.
//!
//! One side submits, the other approves or rejects. Approval by both sides
//! finishes the game and sends both warbands back to the roster ledger.
//! Rejection zeroes the scores and returns the game to active play.

use tracing::{info, instrument, warn};

use crate::CampaignError;
use crate::battle::{
    Effect, Lifecycle, ResultReport, ResultSubmission, Side, Transition, WarbandStatus,
};
use crate::db::{CampaignRepository, Game, LifecycleUpdate, ReportUpdate, UnitOfWork};
use crate::identity::Actor;
use crate::pairing_service::slot_owners;
use crate::retry::RetryPolicy;

/// Service layer for game results.
#[derive(Debug, Clone)]
pub struct ApprovalService {
    repository: CampaignRepository,
    retry: RetryPolicy,
}

/// A game as read before a transition.
struct Snapshot {
    game: Game,
    side: Side,
    lifecycle: Lifecycle,
}

impl ApprovalService {
    /// Creates an approval service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: CampaignRepository, retry: RetryPolicy) -> Self {
        info!("Creating ApprovalService");
        Self { repository, retry }
    }

    /// Submits or edits the result of an active or pending game.
    ///
    /// Both approvals are reset, then the submitter's side approves.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::MalformedInput`] if a numeric field cannot be read
    /// - [`CampaignError::NotFound`] if the game is unknown
    /// - [`CampaignError::Unauthorized`] if the actor controls neither side
    /// - [`CampaignError::InvalidState`] if the game is neither active nor pending
    /// - [`CampaignError::Conflict`] if concurrent updates outlast the retry policy
    #[instrument(skip(self, submission), fields(player_id = actor.player_id()))]
    pub fn submit_result(
        &self,
        actor: &Actor,
        game_id: i32,
        submission: ResultSubmission,
    ) -> Result<Game, CampaignError> {
        let report = submission.normalize()?;
        let columns = ReportUpdate::new(&report, *actor.player_id())?;

        self.retry.run("submit_result", |attempt| {
            let snapshot = self.snapshot(actor, game_id)?;
            let transition = snapshot.lifecycle.submit(snapshot.side)?;
            self.commit(&snapshot, transition, attempt, |uow| {
                uow.write_report(game_id, &columns)?;
                log_submission(game_id, snapshot.side, &report);
                Ok(())
            })
        })
    }

    /// Approves the pending result for the actor's side.
    ///
    /// When both sides have approved the game finishes and both warbands are
    /// set to [`WarbandStatus::NeedsUpdate`] in the same transaction.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::NotFound`] if the game is unknown
    /// - [`CampaignError::Unauthorized`] if the actor controls neither side
    /// - [`CampaignError::InvalidState`] if no result is pending
    /// - [`CampaignError::Conflict`] if concurrent updates outlast the retry policy
    #[instrument(skip(self), fields(player_id = actor.player_id()))]
    pub fn approve(&self, actor: &Actor, game_id: i32) -> Result<Game, CampaignError> {
        self.retry.run("approve", |attempt| {
            let snapshot = self.snapshot(actor, game_id)?;
            let transition = snapshot.lifecycle.approve(snapshot.side)?;
            self.commit(&snapshot, transition, attempt, |uow| {
                if transition.effect == Effect::Finished {
                    let (warband_1, warband_2) = snapshot.game.warband_ids();
                    uow.set_warband_status(warband_1, WarbandStatus::NeedsUpdate)?;
                    uow.set_warband_status(warband_2, WarbandStatus::NeedsUpdate)?;
                    info!(
                        game_id,
                        warband_1,
                        warband_2,
                        "Game finished, warbands need new rosters"
                    );
                } else {
                    info!(game_id, side = %snapshot.side, "Result approved by one side");
                }
                Ok(())
            })
        })
    }

    /// Rejects the pending result.
    ///
    /// Victory and glory points return to zero for both sides, approvals are
    /// cleared and the game is active again. Injuries, skills, elites and
    /// exploration dice from the rejected submission are left in place.
    ///
    /// # Errors
    ///
    /// - [`CampaignError::NotFound`] if the game is unknown
    /// - [`CampaignError::Unauthorized`] if the actor controls neither side
    /// - [`CampaignError::InvalidState`] if no result is pending
    /// - [`CampaignError::Conflict`] if concurrent updates outlast the retry policy
    #[instrument(skip(self), fields(player_id = actor.player_id()))]
    pub fn reject(&self, actor: &Actor, game_id: i32) -> Result<Game, CampaignError> {
        self.retry.run("reject", |attempt| {
            let snapshot = self.snapshot(actor, game_id)?;
            let transition = snapshot.lifecycle.reject()?;
            self.commit(&snapshot, transition, attempt, |uow| {
                uow.reset_scores(game_id)?;
                warn!(game_id, side = %snapshot.side, "Result rejected, game back to active");
                Ok(())
            })
        })
    }

    /// Loads the game and resolves the actor's side.
    ///
    /// A super-admin who owns neither warband acts for both sides.
    fn snapshot(&self, actor: &Actor, game_id: i32) -> Result<Snapshot, CampaignError> {
        self.repository.read(|uow| -> Result<Snapshot, CampaignError> {
            let game = uow
                .game(game_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("game {game_id}")))?;
            let (owner_1, owner_2) = slot_owners(uow, &game)?;
            let side = match actor.side_in(owner_1, owner_2) {
                Some(side) => side,
                None if *actor.super_admin() => Side::Both,
                None => return Err(CampaignError::not_your_game(game_id)),
            };
            let lifecycle = game.lifecycle()?;
            Ok(Snapshot {
                game,
                side,
                lifecycle,
            })
        })
    }

    /// Writes `transition` if the game is unchanged since `snapshot`, then
    /// runs `extra` in the same transaction.
    fn commit<F>(
        &self,
        snapshot: &Snapshot,
        transition: Transition,
        attempt: u32,
        extra: F,
    ) -> Result<Game, CampaignError>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<(), CampaignError>,
    {
        let game_id = *snapshot.game.id();
        let expected = *snapshot.game.version();
        let update = LifecycleUpdate::new(&transition.lifecycle, expected + 1);

        self.repository.write(|uow| {
            if !uow.compare_and_swap_lifecycle(game_id, expected, &update)? {
                return Err(CampaignError::Conflict(format!(
                    "game {game_id} changed concurrently (attempt {attempt})"
                )));
            }
            extra(uow)?;
            uow.game(game_id)?
                .ok_or_else(|| CampaignError::NotFound(format!("game {game_id}")))
        })
    }
}

fn log_submission(game_id: i32, side: Side, report: &ResultReport) {
    info!(
        game_id,
        %side,
        victory_points_1 = report.side_1().victory_points(),
        victory_points_2 = report.side_2().victory_points(),
        glory_points_1 = report.side_1().glory_points(),
        glory_points_2 = report.side_2().glory_points(),
        "Result submitted, awaiting approval"
    );
}
