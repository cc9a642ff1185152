//! Identifiers and the small value types shared by every layer.
//!
//! These are the nouns of the journey: who is playing, which room they are
//! in, what the wagon is carrying, and which sub-decision the turn is
//! waiting on. They serialize straight into snapshots, so their JSON shape
//! is part of the wire contract.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable identifier for a player.
///
/// Minted once when a brand-new session is created and carried by that
/// session afterwards, so a reconnecting browser keeps the same id even
/// though its network connection is new.
///
/// `#[serde(transparent)]` keeps the JSON form a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier for one live network connection.
///
/// Minted by the transport for every accepted socket. Unlike a
/// [`PlayerId`] it changes on every reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A room identifier.
///
/// Lobby rooms get a short random code (`"k3x9qa"`); the permanent
/// continuous room is always [`RoomId::CONTINUOUS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Id of the single continuous-mode room created at process start.
    pub const CONTINUOUS: &'static str = "continuous";

    /// Returns the id of the permanent continuous room.
    pub fn continuous() -> Self {
        Self(Self::CONTINUOUS.to_string())
    }

    /// Returns `true` for the permanent continuous room.
    pub fn is_continuous(&self) -> bool {
        self.0 == Self::CONTINUOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Room-level enums
// ---------------------------------------------------------------------------

/// How a room hosts its turn engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomMode {
    /// One shared engine and one turn rotation for every member.
    Scheduled,
    /// One independent engine per member; nobody waits for anybody.
    Continuous,
}

impl RoomMode {
    /// Label written into leaderboard entries for games played in this mode.
    pub fn leaderboard_label(self) -> &'static str {
        match self {
            Self::Scheduled => "party",
            Self::Continuous => "continuous",
        }
    }
}

impl fmt::Display for RoomMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => f.write_str("scheduled"),
            Self::Continuous => f.write_str("continuous"),
        }
    }
}

/// The lifecycle status of a room.
///
/// ```text
/// Waiting ──(first join)──→ Playing ──(win / party wiped)──→ Finished
///    ↑                                                          │
///    └──────────────────────(reset)─────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if the room accepts new members without a reset.
    pub fn is_joinable(self) -> bool {
        !matches!(self, Self::Finished)
    }

    /// Returns `true` while turns are being played.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Playing => f.write_str("playing"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Players and phases
// ---------------------------------------------------------------------------

/// Whether a player is driven by a connection or by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    Human,
    Automated,
}

/// The phase a turn engine is in, as shown to clients.
///
/// The engine derives this from its pending interaction; it is never
/// stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    MainMenu,
    Hunting,
    Riders,
    Fort,
    Finished,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MainMenu => "main_menu",
            Self::Hunting => "hunting",
            Self::Riders => "riders",
            Self::Fort => "fort",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// How well the party eats this turn. Higher tiers cost more food and
/// lower the chance of illness.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EatingTier {
    Poorly,
    #[default]
    Moderately,
    Well,
}

impl EatingTier {
    /// Numeric level used by the food and illness formulas (1 to 3).
    pub fn level(self) -> u8 {
        match self {
            Self::Poorly => 1,
            Self::Moderately => 2,
            Self::Well => 3,
        }
    }
}

/// A response to a rider encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tactic {
    Flee,
    Fight,
    Proceed,
    CircleWagons,
}

impl Tactic {
    /// Maps the numbered menu choice (1 to 4) to a tactic.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Flee),
            2 => Some(Self::Fight),
            3 => Some(Self::Proceed),
            4 => Some(Self::CircleWagons),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Flee => 1,
            Self::Fight => 2,
            Self::Proceed => 3,
            Self::CircleWagons => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// One of the five tracked quantities in a wagon's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Food,
    Ammunition,
    Clothing,
    Supplies,
    Cash,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Food => "food",
            Self::Ammunition => "ammunition",
            Self::Clothing => "clothing",
            Self::Supplies => "supplies",
            Self::Cash => "cash",
        };
        f.write_str(label)
    }
}

/// The resource ledger carried by one wagon.
///
/// Values are floating point because the hazard formulas scale them by
/// random factors. Clients round for display. Every engine operation ends
/// with [`Resources::clamp`], so no field is ever observed below zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub food: f64,
    pub ammunition: f64,
    pub clothing: f64,
    pub supplies: f64,
    pub cash: f64,
}

impl Resources {
    pub fn get(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Food => self.food,
            Resource::Ammunition => self.ammunition,
            Resource::Clothing => self.clothing,
            Resource::Supplies => self.supplies,
            Resource::Cash => self.cash,
        }
    }

    pub fn get_mut(&mut self, resource: Resource) -> &mut f64 {
        match resource {
            Resource::Food => &mut self.food,
            Resource::Ammunition => &mut self.ammunition,
            Resource::Clothing => &mut self.clothing,
            Resource::Supplies => &mut self.supplies,
            Resource::Cash => &mut self.cash,
        }
    }

    /// Floors every field at zero. Idempotent.
    pub fn clamp(&mut self) {
        for field in [
            &mut self.food,
            &mut self.ammunition,
            &mut self.clothing,
            &mut self.supplies,
            &mut self.cash,
        ] {
            if *field < 0.0 || field.is_nan() {
                *field = 0.0;
            }
        }
    }

    /// Returns `true` if no field is negative.
    pub fn is_clamped(&self) -> bool {
        [self.food, self.ammunition, self.clothing, self.supplies, self.cash]
            .iter()
            .all(|v| *v >= 0.0)
    }

    /// Adds every field of `other` to `self`.
    pub fn absorb(&mut self, other: &Resources) {
        self.food += other.food;
        self.ammunition += other.ammunition;
        self.clothing += other.clothing;
        self.supplies += other.supplies;
        self.cash += other.cash;
    }
}

/// Goods sold at a fort, each with its own pack size and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortItem {
    Food,
    #[serde(alias = "bullets")]
    Ammunition,
    Clothing,
    #[serde(alias = "misc")]
    Supplies,
}

impl FortItem {
    pub const ALL: [FortItem; 4] =
        [Self::Food, Self::Ammunition, Self::Clothing, Self::Supplies];

    /// The ledger field this item stocks.
    pub fn resource(self) -> Resource {
        match self {
            Self::Food => Resource::Food,
            Self::Ammunition => Resource::Ammunition,
            Self::Clothing => Resource::Clothing,
            Self::Supplies => Resource::Supplies,
        }
    }
}

impl fmt::Display for FortItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.resource().fmt(f)
    }
}
