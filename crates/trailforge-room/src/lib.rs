//! Rooms for Trailforge.
//!
//! A [`Room`] hosts either one shared wagon (scheduled mode, members take
//! turns against a clock) or one wagon per member (continuous mode, the
//! permanent "open trail"). All of a room's state sits behind one tokio
//! `RwLock`. Callers get an [`Outcome`] back from every mutation and are
//! expected to publish it only after the call returns.
//!
//! # Key types
//!
//! - [`RoomDirectory`]: creates, finds, lists, and sweeps rooms
//! - [`Room`]: join/leave/logout/kick/reset, gameplay commands, snapshots
//! - [`RoomCommand`]: a gameplay request from one member
//! - [`Outcome`] / [`RoomNotice`]: what to broadcast, record, and save
//! - [`Leaderboard`] / [`GameStore`]: where finished games and the open
//!   trail are written
//!
//! # Lock order
//!
//! The directory's map lock and the session directory's lock are never
//! held while a room lock is taken. The sweeper decides from atomics
//! mirrored out of each room and never locks a room at all.

mod command;
mod config;
mod directory;
mod error;
mod records;
mod room;

pub use command::{Departure, JoinRequest, Joined, Outcome, Persist, RoomCommand, RoomNotice};
pub use config::{DiceSource, RoomConfig};
pub use directory::{RoomDirectory, OPEN_TRAIL_NAME};
pub use error::RoomError;
pub use records::{GameStore, Leaderboard, PersistError, ScoreEntry, TrailSave, TRAIL_SAVE_VERSION};
pub use room::{Reservation, Room};
