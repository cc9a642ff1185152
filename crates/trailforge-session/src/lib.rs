//! Reconnection sessions for Trailforge.
//!
//! A session outlives any single WebSocket. It remembers who a player is
//! (name and [`PlayerId`](trailforge_protocol::PlayerId)), which room they
//! were last in, and which connection last spoke for them, so a dropped
//! browser tab can come back as the same traveller instead of a stranger.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)   ← consults sessions on connect, invalidates on logout
//!     ↕
//! Session Layer    ← token → (name, player id, connection, room)
//!     ↕
//! Protocol (below) ← PlayerId, RoomId, ConnectionId
//! ```
//!
//! Nothing in this crate touches game state.

mod directory;
mod error;
mod session;

pub use directory::{Refresh, SessionDirectory};
pub use error::SessionError;
pub use session::{Session, SessionConfig};
