//! # Trailforge
//!
//! A multiplayer Oregon Trail server.
//!
//! Players connect over WebSocket and either share one wagon in a lobby
//! room, taking turns against a clock, or drive their own wagon on the
//! permanent open trail alongside everyone else. The server is
//! authoritative: clients send choices, the room's turn engine resolves
//! them, and every member receives the narrative and a fresh snapshot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trailforge::prelude::*;
//!
//! # async fn run() -> Result<(), TrailforgeError> {
//! let server = TrailServer::builder()
//!     .config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod hub;
mod leaderboard;
mod persistence;
mod recorder;
mod server;

pub use config::ServerConfig;
pub use error::TrailforgeError;
pub use handler::{MAX_CHAT_CHARS, MAX_NAME_CHARS};
pub use leaderboard::{FileLeaderboard, LeaderboardRecord, LEADERBOARD_FILE, MAX_RECORDS_PER_MODE};
pub use persistence::{JsonFileStore, GAME_STATE_FILE};
pub use server::{TrailServer, TrailServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{
        FileLeaderboard, JsonFileStore, ServerConfig, TrailServer, TrailServerBuilder,
        TrailforgeError, MAX_CHAT_CHARS, MAX_NAME_CHARS,
    };
    pub use trailforge_engine::{DecayRates, Dice};
    pub use trailforge_protocol::{
        ActionKind, ClientMessage, EatingTier, FortItem, PlayerId, RoomId, RoomMode,
        RoomSnapshot, RoomStatus, ServerMessage,
    };
    pub use trailforge_room::{
        DiceSource, GameStore, Leaderboard, PersistError, RoomConfig, ScoreEntry, TrailSave,
    };
    pub use trailforge_session::SessionConfig;
}
