//! The leaderboard file.
//!
//! Every finished journey adds one record per traveller. Records are
//! kept per mode label (`party`, `continuous`), best first: winners
//! ahead of everyone else, then by miles covered. Each mode keeps at most
//! [`MAX_RECORDS_PER_MODE`] records.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use trailforge_room::{Leaderboard, PersistError, ScoreEntry};

use crate::persistence::write_atomically;

/// File name of the leaderboard under the data path.
pub const LEADERBOARD_FILE: &str = "leaderboard.json";

pub const MAX_RECORDS_PER_MODE: usize = 500;

/// One line on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub name: String,
    pub won: bool,
    pub mileage: f64,
    pub turns: u32,
    pub mode: String,
    pub recorded_at: DateTime<Utc>,
}

impl LeaderboardRecord {
    fn from_score(score: &ScoreEntry, now: DateTime<Utc>) -> Self {
        Self {
            name: score.name.clone(),
            won: score.won,
            mileage: score.mileage,
            turns: score.turns,
            mode: score.mode.leaderboard_label().to_string(),
            recorded_at: now,
        }
    }
}

/// [`Leaderboard`] kept in memory and mirrored to `leaderboard.json`.
///
/// Calls block on file I/O; the server runs them off the async threads.
#[derive(Debug)]
pub struct FileLeaderboard {
    path: PathBuf,
    records: Mutex<Vec<LeaderboardRecord>>,
}

impl FileLeaderboard {
    /// Loads `dir/leaderboard.json`, or starts empty if it doesn't exist.
    pub fn open(dir: &Path) -> Result<Self, PersistError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LEADERBOARD_FILE);
        let mut records: Vec<LeaderboardRecord> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        rank(&mut records);
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// The best `limit` records for a mode label.
    pub fn top_by_mode(&self, mode: &str, limit: usize) -> Vec<LeaderboardRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.mode == mode)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Leaderboard for FileLeaderboard {
    fn record(&self, entries: &[ScoreEntry]) -> Result<(), PersistError> {
        if entries.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.extend(entries.iter().map(|e| LeaderboardRecord::from_score(e, now)));
        rank(&mut records);

        let bytes = serde_json::to_vec_pretty(&*records)?;
        write_atomically(&self.path, &bytes)?;
        info!(added = entries.len(), total = records.len(), "leaderboard updated");
        Ok(())
    }
}

/// Sorts best first and trims every mode to its cap.
fn rank(records: &mut Vec<LeaderboardRecord>) {
    records.sort_by(|a, b| {
        b.won
            .cmp(&a.won)
            .then_with(|| b.mileage.total_cmp(&a.mileage))
            .then_with(|| a.recorded_at.cmp(&b.recorded_at))
    });
    let mut kept: Vec<(String, usize)> = Vec::new();
    records.retain(|r| match kept.iter_mut().find(|(mode, _)| *mode == r.mode) {
        Some((_, n)) if *n >= MAX_RECORDS_PER_MODE => false,
        Some((_, n)) => {
            *n += 1;
            true
        }
        None => {
            kept.push((r.mode.clone(), 1));
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailforge_protocol::RoomMode;

    fn score(name: &str, won: bool, mileage: f64, mode: RoomMode) -> ScoreEntry {
        ScoreEntry {
            name: name.to_string(),
            won,
            mileage,
            turns: 12,
            mode,
        }
    }

    // =========================================================================
    // Ranking
    // =========================================================================

    #[test]
    fn test_record_ranks_winners_first_then_miles() {
        let dir = tempfile::tempdir().unwrap();
        let board = FileLeaderboard::open(dir.path()).unwrap();

        board
            .record(&[
                score("Ada", false, 3900.0, RoomMode::Scheduled),
                score("Bo", true, 4510.0, RoomMode::Scheduled),
                score("Cy", false, 4200.0, RoomMode::Scheduled),
            ])
            .unwrap();

        let names: Vec<String> = board
            .top_by_mode("party", 10)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["Bo", "Cy", "Ada"]);
    }

    #[test]
    fn test_top_by_mode_separates_modes_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let board = FileLeaderboard::open(dir.path()).unwrap();
        board
            .record(&[
                score("Ada", false, 100.0, RoomMode::Scheduled),
                score("Bo", false, 200.0, RoomMode::Continuous),
                score("Cy", false, 300.0, RoomMode::Continuous),
            ])
            .unwrap();

        let continuous = board.top_by_mode("continuous", 1);

        assert_eq!(continuous.len(), 1);
        assert_eq!(continuous[0].name, "Cy");
        assert_eq!(board.top_by_mode("party", 10).len(), 1);
    }

    #[test]
    fn test_record_caps_each_mode() {
        let dir = tempfile::tempdir().unwrap();
        let board = FileLeaderboard::open(dir.path()).unwrap();
        let party: Vec<ScoreEntry> = (0..MAX_RECORDS_PER_MODE + 5)
            .map(|i| score(&format!("p{i}"), false, i as f64, RoomMode::Scheduled))
            .collect();

        board.record(&party).unwrap();
        board
            .record(&[score("solo", false, 1.0, RoomMode::Continuous)])
            .unwrap();

        let top = board.top_by_mode("party", usize::MAX);
        assert_eq!(top.len(), MAX_RECORDS_PER_MODE);
        assert_eq!(top.last().unwrap().mileage, 5.0, "lowest five trimmed");
        assert_eq!(board.len(), MAX_RECORDS_PER_MODE + 1);
    }

    // =========================================================================
    // File
    // =========================================================================

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let board = FileLeaderboard::open(dir.path()).unwrap();
            board
                .record(&[score("Ada", true, 4500.0, RoomMode::Continuous)])
                .unwrap();
        }

        let reopened = FileLeaderboard::open(dir.path()).unwrap();

        let top = reopened.top_by_mode("continuous", 5);
        assert_eq!(top.len(), 1);
        assert!(top[0].won);
        assert_eq!(top[0].name, "Ada");
    }

    #[test]
    fn test_record_nothing_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let board = FileLeaderboard::open(dir.path()).unwrap();

        board.record(&[]).unwrap();

        assert!(board.is_empty());
        assert!(!dir.path().join(LEADERBOARD_FILE).exists());
    }
}
