//! The session directory: token → reconnection record.
//!
//! # Concurrency note
//!
//! `SessionDirectory` is a plain `HashMap` wrapper with no locking of its
//! own. The server owns exactly one behind its own mutex and never holds
//! that mutex while a room lock is held.

use std::collections::HashMap;
use std::time::Instant;

use rand::Rng;
use trailforge_protocol::{ConnectionId, PlayerId, RoomId};

use crate::{Session, SessionConfig, SessionError};

/// What [`SessionDirectory::create_or_refresh`] handed back.
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh {
    pub session: Session,
    /// `true` if an existing session was rebound rather than minted.
    pub resumed: bool,
}

/// Every session the server has issued, live or dead.
///
/// Dead sessions are kept (they cost a few bytes) so an old token can
/// never be re-minted by accident; lookups simply skip them.
pub struct SessionDirectory {
    sessions: HashMap<String, Session>,
    /// Index from the attached connection to its session token.
    by_connection: HashMap<ConnectionId, String>,
    next_player: u64,
    config: SessionConfig,
}

impl SessionDirectory {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            by_connection: HashMap::new(),
            next_player: 1,
            config,
        }
    }

    /// Finds or creates the session for a connecting player.
    ///
    /// Matching order:
    /// 1. a live session already attached to `connection`;
    /// 2. a live session with this display name, ignoring ASCII case,
    ///    which is rebound to `connection` (the same player on a new socket);
    /// 3. otherwise a new session with a fresh token and player id.
    pub fn create_or_refresh(
        &mut self,
        name: &str,
        connection: ConnectionId,
        room_id: &RoomId,
    ) -> Refresh {
        let existing = self
            .by_connection
            .get(&connection)
            .filter(|token| self.sessions.get(*token).is_some_and(|s| s.alive))
            .cloned()
            .or_else(|| {
                self.sessions
                    .values()
                    .find(|s| s.alive && s.name.eq_ignore_ascii_case(name))
                    .map(|s| s.token.clone())
            });

        if let Some(token) = existing {
            self.attach(&token, connection, room_id.clone());
            if let Some(session) = self.sessions.get(&token) {
                tracing::debug!(player_id = %session.player_id, %connection, "session refreshed");
                return Refresh {
                    session: session.clone(),
                    resumed: true,
                };
            }
        }

        let token = self.unused_token();
        let player_id = PlayerId(self.next_player);
        self.next_player += 1;
        let session = Session::new(token.clone(), name, player_id, connection, room_id.clone());
        self.by_connection.insert(connection, token.clone());
        self.sessions.insert(token, session.clone());
        tracing::info!(%player_id, %connection, room_id = %room_id, "session created");
        Refresh {
            session,
            resumed: false,
        }
    }

    /// Resumes a session by token on a new connection.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the token is unknown or was logged out.
    pub fn resume(
        &mut self,
        token: &str,
        connection: ConnectionId,
    ) -> Result<Session, SessionError> {
        let room_id = self
            .get(token)?
            .room_id
            .clone()
            .ok_or(SessionError::NotFound)?;
        self.attach(token, connection, room_id);
        let session = self.get(token)?.clone();
        tracing::debug!(player_id = %session.player_id, %connection, "session resumed");
        Ok(session)
    }

    /// Looks up a live session by token.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the token is unknown or dead.
    pub fn get(&self, token: &str) -> Result<&Session, SessionError> {
        self.sessions
            .get(token)
            .filter(|s| s.alive)
            .ok_or(SessionError::NotFound)
    }

    /// The live session attached to `connection`, if any.
    pub fn by_connection(&self, connection: ConnectionId) -> Option<&Session> {
        let token = self.by_connection.get(&connection)?;
        self.sessions.get(token).filter(|s| s.alive)
    }

    /// Records that the player moved to another room.
    pub fn update_room(&mut self, token: &str, room_id: RoomId) {
        if let Some(session) = self.sessions.get_mut(token) {
            session.room_id = Some(room_id);
        }
    }

    /// Forgets the connection without ending the session, so the player
    /// can come back with the same token or name.
    pub fn detach(&mut self, connection: ConnectionId) {
        if let Some(token) = self.by_connection.remove(&connection) {
            if let Some(session) = self.sessions.get_mut(&token) {
                if session.connection == Some(connection) {
                    session.connection = None;
                    session.last_seen = Instant::now();
                }
            }
        }
    }

    /// Ends a session for good. Later lookups of the token fail.
    /// Idempotent.
    pub fn invalidate(&mut self, token: &str) {
        if let Some(session) = self.sessions.get_mut(token) {
            if session.alive {
                tracing::info!(player_id = %session.player_id, "session invalidated");
            }
            session.alive = false;
            if let Some(conn) = session.connection.take() {
                self.by_connection.remove(&conn);
            }
        }
    }

    /// Invalidates detached sessions idle for longer than the configured
    /// expiry. Returns the player ids that were expired.
    pub fn expire_idle(&mut self) -> Vec<PlayerId> {
        let Some(limit) = self.config.idle_expiry else {
            return Vec::new();
        };
        let mut expired = Vec::new();
        for session in self.sessions.values_mut() {
            if session.alive
                && session.connection.is_none()
                && session.last_seen.elapsed() > limit
            {
                session.alive = false;
                expired.push(session.player_id);
                tracing::info!(player_id = %session.player_id, "session expired");
            }
        }
        expired
    }

    /// Makes sure newly minted player ids start after `id`, e.g. after
    /// wagons saved by a previous process have been restored.
    pub fn skip_ids_through(&mut self, id: PlayerId) {
        self.next_player = self.next_player.max(id.0.saturating_add(1));
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.values().filter(|s| s.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn attach(&mut self, token: &str, connection: ConnectionId, room_id: RoomId) {
        let Some(session) = self.sessions.get_mut(token) else {
            return;
        };
        if let Some(old) = session.connection {
            if old != connection {
                self.by_connection.remove(&old);
            }
        }
        session.alive = true;
        session.touch(connection, room_id);
        self.by_connection.insert(connection, token.to_string());
    }

    fn unused_token(&self) -> String {
        loop {
            let token = generate_token(self.config.token_bytes);
            if !self.sessions.contains_key(&token) {
                return token;
            }
        }
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// Random hex string of `bytes` random bytes.
fn generate_token(bytes: usize) -> String {
    let mut rng = rand::rng();
    (0..bytes.max(1))
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}

// =========================================================================
// Tests
// =========================================================================
