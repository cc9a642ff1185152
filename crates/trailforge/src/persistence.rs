//! The open trail's save file.
//!
//! The continuous room is written to `game_state.json` after every
//! turn-ending change and read back once at startup. Writes go to a
//! sibling temp file first and are renamed into place, so a crash never
//! leaves half a save behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use trailforge_room::{GameStore, PersistError, TrailSave, TRAIL_SAVE_VERSION};

/// File name of the trail save under the data path.
pub const GAME_STATE_FILE: &str = "game_state.json";

/// [`GameStore`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Uses `dir/game_state.json`, creating `dir` if needed.
    pub fn open(dir: &Path) -> Result<Self, PersistError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(GAME_STATE_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GameStore for JsonFileStore {
    fn save(&self, save: &TrailSave) -> Result<(), PersistError> {
        let bytes = serde_json::to_vec_pretty(save)?;
        write_atomically(&self.path, &bytes)?;
        debug!(path = %self.path.display(), wagons = save.journeys.len(), "trail saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<TrailSave>, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let save: TrailSave = serde_json::from_slice(&bytes)?;
        if save.version != TRAIL_SAVE_VERSION {
            warn!(
                path = %self.path.display(),
                found = save.version,
                expected = TRAIL_SAVE_VERSION,
                "ignoring trail save from another version"
            );
            return Ok(None);
        }
        Ok(Some(save))
    }

    fn clear(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes `bytes` next to `path` and renames the result over it.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
