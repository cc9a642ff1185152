//! The session record and its configuration.

use std::time::{Duration, Instant};

use trailforge_protocol::{ConnectionId, PlayerId, RoomId};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session directory.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Random bytes in a session token. The token is their hex encoding,
    /// so it is twice this many characters long.
    pub token_bytes: usize,

    /// Sessions not seen for this long are invalidated by
    /// [`SessionDirectory::expire_idle`](crate::SessionDirectory::expire_idle).
    /// `None` keeps them until logout.
    pub idle_expiry: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_bytes: 32,
            idle_expiry: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One player's reconnection record.
///
/// ```text
///   create ──→ live, attached ──(socket drops)──→ live, detached
///                   ↑                                   │
///                   └──────────(reconnect)──────────────┘
///   any ──(logout / idle expiry)──→ dead (never revived)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Secret handed to the browser, presented again on reconnect.
    pub token: String,
    pub name: String,
    /// Stable for the lifetime of the session.
    pub player_id: PlayerId,
    /// The connection currently speaking for this session, if any.
    pub connection: Option<ConnectionId>,
    /// The room the player was last in.
    pub room_id: Option<RoomId>,
    /// `false` once logged out.
    pub alive: bool,
    pub created_at: Instant,
    pub last_seen: Instant,
}

impl Session {
    pub(crate) fn new(
        token: String,
        name: &str,
        player_id: PlayerId,
        connection: ConnectionId,
        room_id: RoomId,
    ) -> Self {
        let now = Instant::now();
        Self {
            token,
            name: name.to_string(),
            player_id,
            connection: Some(connection),
            room_id: Some(room_id),
            alive: true,
            created_at: now,
            last_seen: now,
        }
    }

    /// Rebinds the session to a new connection and room.
    pub(crate) fn touch(&mut self, connection: ConnectionId, room_id: RoomId) {
        self.connection = Some(connection);
        self.room_id = Some(room_id);
        self.last_seen = Instant::now();
    }

    /// Returns `true` if a live connection currently holds this session.
    pub fn is_attached(&self) -> bool {
        self.alive && self.connection.is_some()
    }
}
