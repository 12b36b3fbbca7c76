//! Game lifecycle state machine.
//!
//! ```text
//! planned ──ready×2──▶ active ──submit──▶ pending_approval ──approve×2──▶ finished
//!    │                   ▲                      │    ▲
//!  cancel                └────────reject────────┘    └─resubmit
//!    ▼
//! cancelled
//! ```
//!
//! Transitions are pure: they take the current [`Lifecycle`] and return the
//! next one plus an [`Effect`] the persistence layer has to apply alongside
//! it. Every transition matches exhaustively on [`GameStatus`].

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{GameStatus, Side, SideFlags};

/// The part of a game the state machine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lifecycle {
    /// Current status.
    pub status: GameStatus,
    /// Per-side readiness.
    pub readiness: SideFlags,
    /// Per-side approval of the submitted result.
    pub approvals: SideFlags,
}

/// Actions that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Action {
    /// Withdraw a planned game.
    #[display("cancel")]
    Cancel,
    /// Declare readiness.
    #[display("mark ready")]
    MarkReady,
    /// Submit or edit a result.
    #[display("submit a result for")]
    Submit,
    /// Agree with the submitted result.
    #[display("approve")]
    Approve,
    /// Dispute the submitted result.
    #[display("reject")]
    Reject,
}

/// What the caller must persist besides the new lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Only flags changed.
    Recorded,
    /// Both sides are ready; the game became active.
    Activated,
    /// A result was written; the caller stores the report.
    Submitted,
    /// Both sides approved; both warbands need a new roster.
    Finished,
    /// The result was disputed; scores return to zero.
    Rejected,
    /// The planned game is withdrawn; the caller deletes it.
    Cancelled,
}

/// Outcome of a successful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The lifecycle after the action.
    pub lifecycle: Lifecycle,
    /// Side effect to apply with it.
    pub effect: Effect,
}

/// Error for an action attempted in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum LifecycleError {
    /// The current status does not permit the action.
    #[display("game is not in the right state for this action: cannot {action} a {status} game")]
    InvalidState {
        /// Attempted action.
        action: Action,
        /// Status at the time of the attempt.
        status: GameStatus,
    },
}

impl std::error::Error for LifecycleError {}

impl Lifecycle {
    /// Lifecycle of a freshly proposed game.
    pub fn proposed() -> Self {
        Self {
            status: GameStatus::Planned,
            readiness: SideFlags::default(),
            approvals: SideFlags::default(),
        }
    }

    fn reject_action(&self, action: Action) -> LifecycleError {
        debug!(%action, status = %self.status, "Action not permitted in current status");
        LifecycleError::InvalidState {
            action,
            status: self.status,
        }
    }

    /// Withdraws a planned game.
    #[instrument(skip(self), fields(status = %self.status))]
    pub fn cancel(&self) -> Result<Transition, LifecycleError> {
        match self.status {
            GameStatus::Planned => Ok(Transition {
                lifecycle: Self {
                    status: GameStatus::Cancelled,
                    ..*self
                },
                effect: Effect::Cancelled,
            }),
            GameStatus::Active
            | GameStatus::PendingApproval
            | GameStatus::Finished
            | GameStatus::Cancelled => Err(self.reject_action(Action::Cancel)),
        }
    }

    /// Marks `side` ready. Activates the game once both sides are ready.
    ///
    /// Marking an already-ready side again yields the same lifecycle.
    #[instrument(skip(self), fields(status = %self.status))]
    pub fn mark_ready(&self, side: Side) -> Result<Transition, LifecycleError> {
        match self.status {
            GameStatus::Planned => {
                let readiness = self.readiness.raise(side);
                let (status, effect) = if readiness.both() {
                    (GameStatus::Active, Effect::Activated)
                } else {
                    (GameStatus::Planned, Effect::Recorded)
                };
                Ok(Transition {
                    lifecycle: Self {
                        status,
                        readiness,
                        ..*self
                    },
                    effect,
                })
            }
            GameStatus::Active
            | GameStatus::PendingApproval
            | GameStatus::Finished
            | GameStatus::Cancelled => Err(self.reject_action(Action::MarkReady)),
        }
    }

    /// Records a (re)submitted result from `side`.
    ///
    /// Approvals restart from scratch with only the submitter's side set.
    #[instrument(skip(self), fields(status = %self.status))]
    pub fn submit(&self, side: Side) -> Result<Transition, LifecycleError> {
        match self.status {
            GameStatus::Active | GameStatus::PendingApproval => Ok(Transition {
                lifecycle: Self {
                    status: GameStatus::PendingApproval,
                    approvals: SideFlags::default().raise(side),
                    ..*self
                },
                effect: Effect::Submitted,
            }),
            GameStatus::Planned | GameStatus::Finished | GameStatus::Cancelled => {
                Err(self.reject_action(Action::Submit))
            }
        }
    }

    /// Approves the pending result for `side`. Finishes the game once both
    /// sides have approved.
    #[instrument(skip(self), fields(status = %self.status))]
    pub fn approve(&self, side: Side) -> Result<Transition, LifecycleError> {
        match self.status {
            GameStatus::PendingApproval => {
                let approvals = self.approvals.raise(side);
                let (status, effect) = if approvals.both() {
                    (GameStatus::Finished, Effect::Finished)
                } else {
                    (GameStatus::PendingApproval, Effect::Recorded)
                };
                Ok(Transition {
                    lifecycle: Self {
                        status,
                        approvals,
                        ..*self
                    },
                    effect,
                })
            }
            GameStatus::Planned
            | GameStatus::Active
            | GameStatus::Finished
            | GameStatus::Cancelled => Err(self.reject_action(Action::Approve)),
        }
    }

    /// Rejects the pending result and returns the game to active play.
    #[instrument(skip(self), fields(status = %self.status))]
    pub fn reject(&self) -> Result<Transition, LifecycleError> {
        match self.status {
            GameStatus::PendingApproval => Ok(Transition {
                lifecycle: Self {
                    status: GameStatus::Active,
                    approvals: SideFlags::default(),
                    ..*self
                },
                effect: Effect::Rejected,
            }),
            GameStatus::Planned
            | GameStatus::Active
            | GameStatus::Finished
            | GameStatus::Cancelled => Err(self.reject_action(Action::Reject)),
        }
    }
}
