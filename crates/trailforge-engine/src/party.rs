//! Players and their wagon parties.

use serde::{Deserialize, Serialize};
use trailforge_protocol::{PlayerId, PlayerKind};

use crate::rules::{FULL_HEALTH, SHOOTING_RANK};

/// Names of the five travellers in every party. Index 0 is the leader.
pub const PARTY_NAMES: [&str; 5] = ["You", "Wife", "Son", "Daughter", "Baby"];

/// One traveller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMember {
    pub name: String,
    pub health: u8,
    pub alive: bool,
    pub injured: bool,
}

impl PartyMember {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            health: FULL_HEALTH,
            alive: true,
            injured: false,
        }
    }
}

/// A player and the party they lead.
///
/// `alive` mirrors the leader: once the member at index 0 dies the
/// player's run is over, whatever happens to the rest of the wagon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub kind: PlayerKind,
    pub party: Vec<PartyMember>,
    pub alive: bool,
    pub connected: bool,
    pub shooting_rank: u8,
}

impl Player {
    /// A human player with a fresh party.
    pub fn human(id: PlayerId, name: impl Into<String>) -> Self {
        Self::with_kind(id, name.into(), PlayerKind::Human)
    }

    /// An engine-driven player with a fresh party.
    pub fn automated(id: PlayerId, name: impl Into<String>) -> Self {
        Self::with_kind(id, name.into(), PlayerKind::Automated)
    }

    fn with_kind(id: PlayerId, name: String, kind: PlayerKind) -> Self {
        Self {
            id,
            name,
            kind,
            party: fresh_party(),
            alive: true,
            connected: matches!(kind, PlayerKind::Human),
            shooting_rank: SHOOTING_RANK,
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self.kind, PlayerKind::Human)
    }

    /// Returns `true` if this player can hold the turn.
    pub fn can_hold_turn(&self) -> bool {
        self.is_human() && self.alive
    }

    /// Indices of members still alive.
    pub fn living_members(&self) -> Vec<usize> {
        self.party
            .iter()
            .enumerate()
            .filter(|(_, m)| m.alive)
            .map(|(i, _)| i)
            .collect()
    }

    /// Restores every member to full health and revives the player.
    pub fn reset_party(&mut self) {
        self.party = fresh_party();
        self.alive = true;
    }
}

fn fresh_party() -> Vec<PartyMember> {
    PARTY_NAMES.iter().map(|n| PartyMember::new(n)).collect()
}
