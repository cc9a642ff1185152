//! Versioned room snapshots.
//!
//! A snapshot is the complete picture a client needs to render a room.
//! There is one explicit shape per room mode, so serialization is total
//! and a client can match on `mode` instead of probing optional keys.
//!
//! Bump [`SNAPSHOT_VERSION`] whenever a field is removed or changes
//! meaning; adding an optional field does not need a bump.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    FortItem, PlayerId, PlayerKind, Resources, RoomId, RoomMode, RoomStatus,
    TurnPhase,
};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A room snapshot, tagged by mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoomSnapshot {
    Scheduled(SharedSnapshot),
    Continuous(PerPlayerSnapshot),
}

impl RoomSnapshot {
    pub fn header(&self) -> &RoomHeader {
        match self {
            Self::Scheduled(s) => &s.header,
            Self::Continuous(s) => &s.header,
        }
    }
}

/// Fields common to both modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomHeader {
    pub version: u32,
    pub room_id: RoomId,
    pub name: String,
    pub status: RoomStatus,
    pub owner: Option<PlayerId>,
    pub password_protected: bool,
    pub max_players: Option<usize>,
    /// Connected clients, in join order.
    pub members: Vec<MemberView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberView {
    pub id: PlayerId,
    pub name: String,
}

/// Scheduled mode: one journey, one rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSnapshot {
    pub header: RoomHeader,
    pub journey: JourneyView,
    pub players: Vec<PlayerView>,
    /// Whose turn it is, if anyone's.
    pub current_player: Option<PlayerId>,
    /// Wall-clock time at which the current turn times out.
    pub turn_deadline: Option<DateTime<Utc>>,
}

/// Continuous mode: one journey per member, plus the loot left behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerPlayerSnapshot {
    pub header: RoomHeader,
    pub journeys: Vec<PlayerJourney>,
    pub loot_sites: Vec<LootSiteView>,
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJourney {
    pub player: PlayerView,
    pub journey: JourneyView,
}

/// The state of one turn engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyView {
    pub turn: u32,
    pub week: u32,
    pub mileage: f64,
    pub trail_length: f64,
    pub resources: Resources,
    pub oxen: f64,
    pub phase: TurnPhase,
    pub fort_available: bool,
    pub finished: bool,
    pub won: bool,
    pub arrival_date: Option<String>,
    /// Present while the engine waits for a rider tactic.
    pub encounter: Option<EncounterView>,
    /// Present while the engine is at a fort.
    pub fort_offers: Option<Vec<FortOffer>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncounterView {
    pub hostile: bool,
    pub riders: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortOffer {
    pub item: FortItem,
    pub label: String,
    pub price: f64,
    pub pack: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub kind: PlayerKind,
    pub alive: bool,
    pub connected: bool,
    pub party: Vec<PartyMemberView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMemberView {
    pub name: String,
    pub health: u8,
    pub alive: bool,
    pub injured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootSiteView {
    pub id: String,
    pub owner_name: String,
    pub mileage: f64,
    pub resources: Resources,
    pub oxen: f64,
    pub created_at: DateTime<Utc>,
    pub claimed_by: Option<String>,
}

/// One line of the lobby listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyEntry {
    pub room_id: RoomId,
    pub name: String,
    pub mode: RoomMode,
    pub status: RoomStatus,
    pub players: usize,
    pub max_players: Option<usize>,
    pub password_protected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> RoomHeader {
        RoomHeader {
            version: SNAPSHOT_VERSION,
            room_id: RoomId::from("ab12cd"),
            name: "Oregon or Bust".into(),
            status: RoomStatus::Playing,
            owner: Some(PlayerId(1)),
            password_protected: false,
            max_players: Some(4),
            members: vec![MemberView {
                id: PlayerId(1),
                name: "Ada".into(),
            }],
        }
    }

    fn journey() -> JourneyView {
        JourneyView {
            turn: 1,
            week: 0,
            mileage: 0.0,
            trail_length: 4500.0,
            resources: Resources::default(),
            oxen: 220.0,
            phase: TurnPhase::MainMenu,
            fort_available: false,
            finished: false,
            won: false,
            arrival_date: None,
            encounter: None,
            fort_offers: None,
        }
    }

    #[test]
    fn test_snapshot_is_tagged_by_mode() {
        let snap = RoomSnapshot::Scheduled(SharedSnapshot {
            header: header(),
            journey: journey(),
            players: Vec::new(),
            current_player: Some(PlayerId(1)),
            turn_deadline: None,
        });

        let json = serde_json::to_value(&snap).unwrap();

        assert_eq!(json["mode"], "scheduled");
        assert_eq!(json["header"]["version"], SNAPSHOT_VERSION);
        assert_eq!(json["journey"]["phase"], "main_menu");
        assert_eq!(json["current_player"], 1);
    }

    #[test]
    fn test_continuous_snapshot_round_trips() {
        let snap = RoomSnapshot::Continuous(PerPlayerSnapshot {
            header: header(),
            journeys: Vec::new(),
            loot_sites: Vec::new(),
            won: false,
        });
        let json = serde_json::to_string(&snap).unwrap();
        let back: RoomSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
        assert_eq!(back.header().name, "Oregon or Bust");
    }
}
