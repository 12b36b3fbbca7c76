//! Which slot of a game an actor speaks for.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// The slot (or slots) an actor controls in a game.
///
/// Games have ordered slots: `warband_1` and `warband_2`. A player who owns
/// both warbands controls [`Side::Both`], and a single action from them
/// satisfies both per-side flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Side {
    /// The `warband_1` slot.
    #[display("slot 1")]
    Slot1,
    /// The `warband_2` slot.
    #[display("slot 2")]
    Slot2,
    /// Both slots, when one player owns both warbands.
    #[display("both slots")]
    Both,
}

impl Side {
    /// Returns true if this side includes the `warband_1` slot.
    pub fn covers_slot_1(self) -> bool {
        matches!(self, Self::Slot1 | Self::Both)
    }

    /// Returns true if this side includes the `warband_2` slot.
    pub fn covers_slot_2(self) -> bool {
        matches!(self, Self::Slot2 | Self::Both)
    }
}

/// Resolves the side a player controls from the owners of the two slots.
///
/// Ownership is matched against the warbands themselves, not the rosters
/// attached to the game. Returns `None` if the player owns neither.
#[instrument]
pub fn resolve_side(owner_1: i32, owner_2: i32, player_id: i32) -> Option<Side> {
    let side = match (owner_1 == player_id, owner_2 == player_id) {
        (true, true) => Some(Side::Both),
        (true, false) => Some(Side::Slot1),
        (false, true) => Some(Side::Slot2),
        (false, false) => None,
    };
    debug!(?side, "Resolved side");
    side
}

/// One boolean per slot, used for readiness and approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SideFlags {
    /// Flag for the `warband_1` slot.
    pub slot_1: bool,
    /// Flag for the `warband_2` slot.
    pub slot_2: bool,
}

impl SideFlags {
    /// Creates flags from explicit values.
    pub fn new(slot_1: bool, slot_2: bool) -> Self {
        Self { slot_1, slot_2 }
    }

    /// Returns a copy with the flag(s) for `side` set.
    pub fn raise(self, side: Side) -> Self {
        Self {
            slot_1: self.slot_1 || side.covers_slot_1(),
            slot_2: self.slot_2 || side.covers_slot_2(),
        }
    }

    /// Returns true if both flags are set.
    pub fn both(self) -> bool {
        self.slot_1 && self.slot_2
    }
}
