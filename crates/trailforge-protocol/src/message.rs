//! Client and server messages.
//!
//! Both enums are internally tagged (`{"type": "fort_buy", ...}`) so the
//! browser client can switch on a single field.

use serde::{Deserialize, Serialize};

use crate::{EatingTier, FortItem, LobbyEntry, PlayerId, RoomId, RoomSnapshot};

/// The top-level choice made from the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Hunt,
    Start,
    /// Any unrecognised action name travels on, like "continue".
    #[serde(other)]
    Continue,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hunt => "hunt",
            Self::Start => "start",
            Self::Continue => "continue",
        }
    }
}

/// Messages sent from a client to the server after the connection is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A main-menu action.
    Action {
        action: ActionKind,
        /// How well to eat while travelling. Defaults to moderately.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        eating: Option<EatingTier>,
    },

    /// Result of the hunting reflex test, in milliseconds.
    HuntShoot { time: u32 },

    /// Numbered rider tactic (1 flee, 2 fight, 3 proceed, 4 circle).
    RiderTactic { tactic: u8 },

    FortEnter,
    FortBuy { item: FortItem, qty: i64 },
    FortSell { item: FortItem, qty: i64 },
    FortLeave,

    /// Scavenge a dead party's wagon (continuous room only).
    LootClaim { loot_site_id: String },

    /// Restart a finished room.
    Reset,

    /// Owner-only: remove another member from the room.
    Kick { target_id: PlayerId },

    /// Leave the room for good and invalidate the session.
    Logout,

    Chat { message: String },

    /// Ask for the joinable lobby rooms.
    ListRooms,

    /// Open a new scheduled room. Members join it by reconnecting with
    /// `?room=<id>`.
    CreateRoom {
        name: String,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        max_players: Option<usize>,
    },
}

impl ClientMessage {
    /// Short label used in logs and narrative events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Action { action, .. } => action.as_str(),
            Self::HuntShoot { .. } => "hunt_shoot",
            Self::RiderTactic { .. } => "rider_tactic",
            Self::FortEnter => "fort_enter",
            Self::FortBuy { .. } => "fort_buy",
            Self::FortSell { .. } => "fort_sell",
            Self::FortLeave => "fort_leave",
            Self::LootClaim { .. } => "loot_claim",
            Self::Reset => "reset",
            Self::Kick { .. } => "kick",
            Self::Logout => "logout",
            Self::Chat { .. } => "chat",
            Self::ListRooms => "list_rooms",
            Self::CreateRoom { .. } => "create_room",
        }
    }
}

/// Stable numeric codes for rejected requests.
///
/// The values follow HTTP conventions so client code can reuse its
/// existing status handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
    BadRequest,
    InsufficientResource,
    NotYourTurn,
    NotFound,
    WrongPhase,
}

impl RejectCode {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::InsufficientResource => 402,
            Self::NotYourTurn => 403,
            Self::NotFound => 404,
            Self::WrongPhase => 409,
        }
    }
}

/// Messages sent from the server to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection.
    Welcome {
        player_id: PlayerId,
        session_token: String,
        resumed: bool,
        name: String,
        room_id: RoomId,
    },

    /// Full room snapshot, sent after every change.
    State { snapshot: RoomSnapshot },

    /// Narrative produced by one player's action.
    Event {
        player: String,
        action: String,
        narrative: String,
    },

    Chat { player: String, message: String },

    /// The request was refused and nothing changed.
    Rejected { code: u16, message: String },

    /// The owner removed this client from the room.
    Kicked { reason: String },

    RoomList { rooms: Vec<LobbyEntry> },

    RoomCreated { room_id: RoomId },

    /// The room is gone; the connection will close.
    Closed { reason: String },
}
