//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Settings for one [`TrailServer`](crate::TrailServer).
///
/// Everything has a default; [`from_env`](Self::from_env) overrides the
/// values a deployment usually needs to change.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to (`TRAIL_ADDR`).
    pub bind_addr: String,

    /// Directory holding `leaderboard.json` and `game_state.json`
    /// (`DATA_PATH`).
    pub data_path: PathBuf,

    /// Scheduled-room turn clock (`TURN_SECONDS`).
    pub turn_time: Duration,

    /// How often stale rooms are swept.
    pub sweep_interval: Duration,

    /// How often loot sites on the open trail spoil.
    pub decay_interval: Duration,

    /// Messages buffered per connection before it is dropped as too slow.
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            data_path: PathBuf::from("./data"),
            turn_time: Duration::from_secs(20),
            sweep_interval: Duration::from_secs(5 * 60),
            decay_interval: Duration::from_secs(24 * 60 * 60),
            outbound_queue: 256,
        }
    }
}

impl ServerConfig {
    /// Reads `TRAIL_ADDR`, `DATA_PATH` and `TURN_SECONDS`, falling back to
    /// the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(addr) = lookup("TRAIL_ADDR").filter(|v| !v.trim().is_empty()) {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("DATA_PATH").filter(|v| !v.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("TURN_SECONDS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.turn_time = Duration::from_secs(secs),
                _ => warn!(value = %raw, "ignoring invalid TURN_SECONDS"),
            }
        }
        config
    }
}
