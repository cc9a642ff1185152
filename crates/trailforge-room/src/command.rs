//! What goes into a room and what comes out of it.

use trailforge_protocol::{
    ActionKind, ConnectionId, EatingTier, FortItem, PlayerId, RoomId,
};

use crate::ScoreEntry;

/// A gameplay request from one member.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    /// A main-menu choice (`hunt`, `continue`, `start`).
    Action {
        action: ActionKind,
        eating: Option<EatingTier>,
    },
    /// The reflex-test result for a hunt in progress.
    HuntShot { reaction_ms: u32 },
    /// A numbered tactic (1 to 4) against riders. Anything else means
    /// "proceed".
    RiderTactic { code: u8 },
    FortEnter,
    FortBuy { item: FortItem, qty: i64 },
    FortSell { item: FortItem, qty: i64 },
    FortLeave,
    /// Scavenge an abandoned wagon (continuous rooms only).
    ClaimLoot { site_id: String },
}

impl RoomCommand {
    /// Label used for narrative events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Action { action, .. } => action.as_str(),
            Self::HuntShot { .. } => "hunt_shoot",
            Self::RiderTactic { .. } => "rider_tactic",
            Self::FortEnter => "fort_enter",
            Self::FortBuy { .. } => "fort_buy",
            Self::FortSell { .. } => "fort_sell",
            Self::FortLeave => "fort_leave",
            Self::ClaimLoot { .. } => "loot_claim",
        }
    }
}

/// A connecting member, as the server resolved them from their session.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub player_id: PlayerId,
    pub name: String,
    pub connection: ConnectionId,
    pub password: Option<String>,
    /// The player came back through a live session, so the password was
    /// already checked on their first join.
    pub resumed: bool,
}

/// What [`Room::join`](crate::Room::join) did.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    /// The player already had a seat and took it back.
    pub returning: bool,
    /// Another connection was speaking for this player and has been
    /// replaced. The caller should close it.
    pub replaced: Option<ConnectionId>,
    /// The join started the room's journey.
    pub started: bool,
}

/// What [`Room::leave`](crate::Room::leave), [`Room::logout`](crate::Room::logout)
/// and [`Room::kick`](crate::Room::kick) did.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub name: String,
    /// The connection that was speaking for the player, if any.
    pub connection: Option<ConnectionId>,
    /// Nobody is left in the room.
    pub now_empty: bool,
    pub outcome: Outcome,
}

/// Whether the continuous trail should be written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persist {
    #[default]
    Nothing,
    Save,
    /// Someone won; the saved trail is obsolete.
    Clear,
}

/// The result of a successful room mutation, ready to publish.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    /// Display name of whoever acted, or of the player the clock ran out on.
    pub actor: String,
    pub action: String,
    pub narrative: String,
    /// Results to record, non-empty exactly when the room just finished.
    pub scores: Vec<ScoreEntry>,
    pub persist: Persist,
}

impl Outcome {
    pub(crate) fn new(actor: &str, action: &str, narrative: String) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            narrative,
            ..Self::default()
        }
    }
}

/// An outcome the room produced on its own, such as a turn timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomNotice {
    pub room_id: RoomId,
    pub outcome: Outcome,
}
