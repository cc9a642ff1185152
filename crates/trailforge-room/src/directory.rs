//! The room directory: every room the server knows about, by id.
//!
//! The directory lock only guards the map. It is never held while a room
//! lock is taken; anything that needs a room's contents collects the
//! `Arc`s first, releases the map, and then visits each room.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use trailforge_protocol::{LobbyEntry, RoomId, RoomMode, RoomStatus};

use crate::{Reservation, Room, RoomConfig, RoomError, RoomNotice};

/// Display name of the permanent continuous room.
pub const OPEN_TRAIL_NAME: &str = "The Open Trail";

const ROOM_ID_LEN: usize = 6;
const ROOM_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// All rooms, plus the one continuous room that is never removed.
#[derive(Debug)]
pub struct RoomDirectory {
    rooms: RwLock<HashMap<RoomId, Arc<Room>>>,
    continuous: Arc<Room>,
    config: Arc<RoomConfig>,
    notices: mpsc::UnboundedSender<RoomNotice>,
}

impl RoomDirectory {
    /// Creates the directory and its continuous room.
    ///
    /// Outcomes rooms produce on their own (turn timeouts) arrive on the
    /// returned receiver.
    pub fn new(config: RoomConfig) -> (Self, mpsc::UnboundedReceiver<RoomNotice>) {
        let (notices, rx) = mpsc::unbounded_channel();
        let config = Arc::new(config);
        let continuous = Room::continuous(
            RoomId::continuous(),
            OPEN_TRAIL_NAME,
            config.clone(),
            notices.clone(),
        );
        let mut rooms = HashMap::new();
        rooms.insert(continuous.id().clone(), continuous.clone());

        let directory = Self {
            rooms: RwLock::new(rooms),
            continuous,
            config,
            notices,
        };
        (directory, rx)
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// The permanent open-trail room.
    pub fn continuous(&self) -> &Arc<Room> {
        &self.continuous
    }

    /// Opens a new scheduled room under a fresh six-character id.
    pub async fn create_room(
        &self,
        name: &str,
        password: Option<String>,
        max_players: Option<usize>,
    ) -> Arc<Room> {
        let mut rooms = self.rooms.write().await;
        let id = loop {
            let candidate = random_room_id();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let name = match name.trim() {
            "" => format!("Wagon Train {id}"),
            trimmed => trimmed.to_string(),
        };
        let room = Room::scheduled(
            id.clone(),
            name,
            password,
            max_players,
            self.config.clone(),
            self.notices.clone(),
        );
        rooms.insert(id.clone(), room.clone());
        info!(room_id = %id, name = %room.name(), total = rooms.len(), "room created");
        room
    }

    pub async fn get(&self, id: &RoomId) -> Result<Arc<Room>, RoomError> {
        self.rooms
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(id.clone()))
    }

    /// Looks a room up and marks a join in flight, in one step under the
    /// directory lock, so the sweeper can't remove it in between.
    pub async fn reserve(&self, id: &RoomId) -> Result<Reservation, RoomError> {
        let rooms = self.rooms.read().await;
        let room = rooms
            .get(id)
            .ok_or_else(|| RoomError::NotFound(id.clone()))?;
        Ok(room.reserve())
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Lobby listing: the open trail first, then the rest by id.
    pub async fn list_lobbies(&self) -> Vec<LobbyEntry> {
        let mut rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        rooms.sort_by(|a, b| {
            b.id()
                .is_continuous()
                .cmp(&a.id().is_continuous())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });

        let mut entries = Vec::with_capacity(rooms.len());
        for room in rooms {
            entries.push(room.lobby_entry().await);
        }
        entries
    }

    /// Deletes the room if nobody is in it or on the way in. The open
    /// trail is never deleted.
    pub async fn remove_if_empty(&self, id: &RoomId) -> bool {
        if id.is_continuous() {
            return false;
        }
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(id) else {
            return false;
        };
        if room.member_count() > 0 || room.pending_joins() > 0 {
            return false;
        }
        rooms.remove(id);
        info!(room_id = %id, "room removed (empty)");
        true
    }

    /// Removes rooms that are empty, finished past their grace period, or
    /// left waiting too long. Returns the ids removed.
    pub async fn sweep(&self) -> Vec<RoomId> {
        let mut rooms = self.rooms.write().await;
        let mut removed = Vec::new();
        rooms.retain(|id, room| match self.stale_reason(room) {
            Some(reason) => {
                info!(room_id = %id, reason, "stale room removed");
                removed.push(id.clone());
                false
            }
            None => true,
        });
        debug!(removed = removed.len(), remaining = rooms.len(), "room sweep done");
        removed
    }

    /// Judged from the room's atomics only; no room lock is taken.
    fn stale_reason(&self, room: &Room) -> Option<&'static str> {
        if room.id().is_continuous() || room.pending_joins() > 0 {
            return None;
        }
        if room.member_count() == 0 {
            return Some("empty");
        }
        match room.status() {
            RoomStatus::Finished if room.time_in_status() > self.config.finished_grace => {
                Some("finished")
            }
            RoomStatus::Waiting if room.created_at().elapsed() > self.config.waiting_ttl => {
                Some("stale waiting")
            }
            _ => None,
        }
    }

    /// Spoils the loot in every continuous room, one room lock at a time.
    /// Returns the number of sites that changed.
    pub async fn decay_loot_sites(&self) -> usize {
        let rooms: Vec<Arc<Room>> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|room| room.mode() == RoomMode::Continuous)
            .cloned()
            .collect();

        let mut decayed = 0;
        for room in rooms {
            decayed += room.decay_loot(&self.config.decay).await;
        }
        if decayed > 0 {
            info!(sites = decayed, "loot sites decayed");
        }
        decayed
    }
}

fn random_room_id() -> RoomId {
    let mut rng = rand::rng();
    let id: String = (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())] as char)
        .collect();
    RoomId(id)
}
