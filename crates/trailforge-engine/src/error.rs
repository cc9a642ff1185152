//! Error types for the turn engine.

use trailforge_protocol::{PlayerId, Resource, TurnPhase};

/// Why the engine refused an operation.
///
/// Every check happens before any mutation, so an `Err` always means the
/// state is exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The player is not on this wagon train.
    #[error("player {0} is not part of this journey")]
    UnknownPlayer(PlayerId),

    /// The player's leader is dead; they can only watch or restart.
    #[error("{0}'s party has perished")]
    PartyLost(String),

    /// The journey already ended in arrival or ruin.
    #[error("the journey is over")]
    JourneyOver,

    /// The operation doesn't fit the current phase.
    #[error("{message} (phase: {phase})")]
    WrongPhase {
        message: &'static str,
        phase: TurnPhase,
    },

    /// No fort is in reach this turn.
    #[error("there is no fort nearby this turn")]
    FortUnavailable,

    /// Not enough of something to pay for the action.
    #[error("not enough {resource}: need {needed:.0}, have {available:.0}")]
    Insufficient {
        resource: Resource,
        needed: f64,
        available: f64,
    },

    /// Quantities must be at least one pack.
    #[error("invalid quantity {0}")]
    InvalidQuantity(i64),

    /// No loot site with this id.
    #[error("no loot site {0}")]
    UnknownLootSite(String),

    /// The site is too far up or down the trail.
    #[error("that wagon is {distance:.0} miles away")]
    LootOutOfReach { distance: f64 },

    /// Someone already emptied the site.
    #[error("already scavenged by {0}")]
    LootClaimed(String),
}
