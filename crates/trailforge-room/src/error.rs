//! Error types for the room layer.

use trailforge_engine::EngineError;
use trailforge_protocol::{PlayerId, RejectCode, RoomId};

/// Why a room refused a request. Nothing changed when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (or was swept).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's player cap is reached.
    #[error("room {0} is full")]
    Full(RoomId),

    #[error("wrong password")]
    WrongPassword,

    /// The name died on this run and may not rejoin until a reset.
    #[error("{0} has perished on this journey; wait for a reset")]
    Banned(String),

    /// The player is not a member of this room.
    #[error("player {0} is not in this room")]
    NotMember(PlayerId),

    /// Scheduled rooms take one turn at a time.
    #[error("it's not your turn")]
    NotYourTurn,

    /// Continuous rooms: the player has no journey here (logged out or
    /// never joined).
    #[error("your journey was not found; please rejoin")]
    NoJourney,

    #[error("only the room owner can do that")]
    NotOwner,

    #[error("you can't kick yourself")]
    KickSelf,

    /// Reset requested before the journey ended.
    #[error("the journey is still under way")]
    StillRunning,

    /// Continuous rooms only reset after someone reaches Oregon.
    #[error("the trail resets only after someone reaches Oregon")]
    NotWon,

    /// The request only makes sense in the other room mode.
    #[error("{0}")]
    WrongMode(&'static str),

    /// The turn engine refused the action.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl RoomError {
    /// The code sent to the requesting client.
    pub fn reject_code(&self) -> RejectCode {
        match self {
            Self::NotFound(_) | Self::NotMember(_) => RejectCode::NotFound,
            Self::Full(_)
            | Self::Banned(_)
            | Self::WrongPassword
            | Self::NotYourTurn
            | Self::NoJourney
            | Self::NotOwner => RejectCode::NotYourTurn,
            Self::KickSelf => RejectCode::BadRequest,
            Self::StillRunning | Self::NotWon | Self::WrongMode(_) => {
                RejectCode::WrongPhase
            }
            Self::Engine(e) => match e {
                EngineError::UnknownPlayer(_) | EngineError::PartyLost(_) => {
                    RejectCode::NotYourTurn
                }
                EngineError::Insufficient { .. } => {
                    RejectCode::InsufficientResource
                }
                EngineError::InvalidQuantity(_) => RejectCode::BadRequest,
                EngineError::UnknownLootSite(_) => RejectCode::NotFound,
                EngineError::JourneyOver
                | EngineError::WrongPhase { .. }
                | EngineError::FortUnavailable
                | EngineError::LootOutOfReach { .. }
                | EngineError::LootClaimed(_) => RejectCode::WrongPhase,
            },
        }
    }
}
