//! Seams to the outside world: the leaderboard and the trail save file.
//!
//! Rooms never call these themselves. They report what should be recorded
//! in an [`Outcome`](crate::Outcome), and whoever publishes the outcome
//! does the I/O after the room lock is gone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trailforge_engine::{LootSite, SavedGame};
use trailforge_protocol::RoomMode;

/// Save-file schema version.
pub const TRAIL_SAVE_VERSION: u32 = 1;

/// One player's result when a room finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub name: String,
    pub won: bool,
    pub mileage: f64,
    pub turns: u32,
    pub mode: RoomMode,
}

/// Where finished journeys are recorded.
pub trait Leaderboard: Send + Sync + 'static {
    /// Records a batch of results. Best effort; callers log failures.
    fn record(&self, entries: &[ScoreEntry]) -> Result<(), PersistError>;
}

/// Everything needed to bring the continuous room back after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailSave {
    pub version: u32,
    /// One engine per traveller, each with a roster of one.
    pub journeys: Vec<SavedGame>,
    #[serde(default)]
    pub loot_sites: Vec<LootSite>,
    #[serde(default)]
    pub won: bool,
    pub saved_at: DateTime<Utc>,
}

/// Best-effort storage for the continuous room.
pub trait GameStore: Send + Sync + 'static {
    fn save(&self, save: &TrailSave) -> Result<(), PersistError>;

    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<TrailSave>, PersistError>;

    /// Forgets the saved trail, e.g. once someone has won.
    fn clear(&self) -> Result<(), PersistError>;
}

/// Failures of the leaderboard or the save file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad save data: {0}")]
    Format(#[from] serde_json::Error),
}
