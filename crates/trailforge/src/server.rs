//! `TrailServer` builder and server loop.
//!
//! This is the entry point for running a Trailforge server. It ties the
//! layers together: transport → protocol → session → room, plus the hub
//! that fans results back out and the jobs that keep the room list tidy.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use trailforge_protocol::{Codec, JsonCodec, RoomId, ServerMessage};
use trailforge_room::{
    GameStore, Leaderboard, Outcome, Persist, Room, RoomConfig, RoomDirectory, RoomNotice,
};
use trailforge_session::{SessionConfig, SessionDirectory};
use trailforge_timer::{PeriodicConfig, PeriodicTask};
use trailforge_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::hub::{Frame, Hub};
use crate::recorder::Recorder;
use crate::{FileLeaderboard, JsonFileStore, ServerConfig, TrailforgeError};

/// Shared server state passed to each connection handler task.
///
/// Lock order: the session mutex, the room directory, and the hub are
/// each taken and released on their own, never while a room lock is held.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionDirectory>,
    pub(crate) rooms: RoomDirectory,
    pub(crate) hub: Hub,
    pub(crate) codec: C,
    pub(crate) recorder: Recorder,
    pub(crate) outbound_queue: usize,
}

impl<C: Codec> ServerState<C> {
    /// Encodes a message once for any number of queues. Encoding our own
    /// message types can't really fail, but if it does the message is
    /// logged and skipped.
    pub(crate) fn encode(&self, msg: &ServerMessage) -> Option<Frame> {
        match self.codec.encode(msg) {
            Ok(bytes) => Some(Arc::new(bytes)),
            Err(e) => {
                error!(error = %e, "failed to encode server message");
                None
            }
        }
    }

    pub(crate) async fn broadcast(&self, room_id: &RoomId, msg: &ServerMessage) {
        if let Some(frame) = self.encode(msg) {
            self.hub.broadcast(room_id, frame).await;
        }
    }

    /// Sends the room's current snapshot to all of its subscribers.
    pub(crate) async fn broadcast_state(&self, room: &Room) {
        let snapshot = room.snapshot().await;
        self.broadcast(room.id(), &ServerMessage::State { snapshot }).await;
    }

    /// Publishes a room outcome: the narrative, then the new state, then
    /// whatever needs recording. Call only after the room call returned.
    pub(crate) async fn publish(&self, room: &Room, outcome: Outcome) {
        if !outcome.narrative.is_empty() {
            let event = ServerMessage::Event {
                player: outcome.actor,
                action: outcome.action,
                narrative: outcome.narrative,
            };
            self.broadcast(room.id(), &event).await;
        }
        self.broadcast_state(room).await;

        self.recorder.scores(outcome.scores);
        match outcome.persist {
            Persist::Nothing => {}
            Persist::Save => {
                if let Some(save) = room.saved_state().await {
                    self.recorder.save(save);
                }
            }
            Persist::Clear => self.recorder.clear(),
        }
    }

    /// Removes stale rooms and tells anyone still inside.
    async fn sweep(&self) {
        let removed = self.rooms.sweep().await;
        let farewell = self.encode(&ServerMessage::Closed {
            reason: "This wagon train has disbanded.".to_string(),
        });
        for room_id in &removed {
            self.hub.close_room(room_id, farewell.clone()).await;
        }

        let expired = self.sessions.lock().await.expire_idle();
        if !removed.is_empty() || !expired.is_empty() {
            info!(rooms = removed.len(), sessions = expired.len(), "sweep finished");
        }
    }

    /// Spoils loot on the open trail and saves it if anything changed.
    async fn decay(&self) {
        if self.rooms.decay_loot_sites().await == 0 {
            return;
        }
        let trail = self.rooms.continuous().clone();
        if let Some(save) = trail.saved_state().await {
            self.recorder.save(save);
        }
        self.broadcast_state(&trail).await;
    }
}

/// Publishes outcomes rooms produce on their own, such as turn timeouts.
async fn relay_notices<C: Codec>(
    state: Arc<ServerState<C>>,
    mut notices: mpsc::UnboundedReceiver<RoomNotice>,
) {
    while let Some(notice) = notices.recv().await {
        match state.rooms.get(&notice.room_id).await {
            Ok(room) => state.publish(&room, notice.outcome).await,
            Err(e) => debug!(error = %e, "notice for a removed room"),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Trailforge server.
///
/// # Example
///
/// ```rust,ignore
/// use trailforge::prelude::*;
///
/// let server = TrailServer::builder()
///     .config(ServerConfig::from_env())
///     .build()
///     .await?;
/// server.run_until(tokio::signal::ctrl_c()).await
/// ```
pub struct TrailServerBuilder {
    config: ServerConfig,
    session_config: SessionConfig,
    room_config: Option<RoomConfig>,
    leaderboard: Option<Arc<dyn Leaderboard>>,
    store: Option<Arc<dyn GameStore>>,
}

impl TrailServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            session_config: SessionConfig::default(),
            room_config: None,
            leaderboard: None,
            store: None,
        }
    }

    /// Replaces the whole server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the directory for the leaderboard and the trail save.
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_path = path.into();
        self
    }

    /// Sets the scheduled-room turn clock. Ignored if a full
    /// [`RoomConfig`] is supplied.
    pub fn turn_time(mut self, turn_time: Duration) -> Self {
        self.config.turn_time = turn_time;
        self
    }

    pub fn sweep_interval(mut self, every: Duration) -> Self {
        self.config.sweep_interval = every;
        self
    }

    pub fn decay_interval(mut self, every: Duration) -> Self {
        self.config.decay_interval = every;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the room configuration (turn clock, grace periods, dice).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = Some(config);
        self
    }

    /// Records finished journeys somewhere other than `leaderboard.json`.
    pub fn leaderboard(mut self, leaderboard: Arc<dyn Leaderboard>) -> Self {
        self.leaderboard = Some(leaderboard);
        self
    }

    /// Saves the open trail somewhere other than `game_state.json`.
    pub fn store(mut self, store: Arc<dyn GameStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Binds the listener, restores the open trail, and starts the
    /// recorder.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<TrailServer<JsonCodec>, TrailforgeError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let leaderboard: Arc<dyn Leaderboard> = match self.leaderboard {
            Some(leaderboard) => leaderboard,
            None => Arc::new(FileLeaderboard::open(&self.config.data_path)?),
        };
        let store: Arc<dyn GameStore> = match self.store {
            Some(store) => store,
            None => Arc::new(JsonFileStore::open(&self.config.data_path)?),
        };

        let room_config = self.room_config.unwrap_or_else(|| RoomConfig {
            turn_time: self.config.turn_time,
            ..RoomConfig::default()
        });
        let (rooms, notices) = RoomDirectory::new(room_config);

        let trail = rooms.continuous().clone();
        let loaded = {
            let store = store.clone();
            tokio::task::spawn_blocking(move || store.load()).await
        };
        match loaded {
            Ok(Ok(Some(save))) => {
                trail.restore(save).await;
            }
            Ok(Ok(None)) => debug!("no saved trail; starting fresh"),
            Ok(Err(e)) => warn!(error = %e, "could not load saved trail; starting fresh"),
            Err(e) => error!(error = %e, "trail load panicked; starting fresh"),
        }

        let mut sessions = SessionDirectory::new(self.session_config);
        if let Some(highest) = trail.highest_player_id().await {
            sessions.skip_ids_through(highest);
        }

        let recorder = Recorder::spawn(leaderboard, store);
        let state = Arc::new(ServerState {
            sessions: Mutex::new(sessions),
            rooms,
            hub: Hub::new(),
            codec: JsonCodec,
            recorder,
            outbound_queue: self.config.outbound_queue.max(1),
        });

        Ok(TrailServer {
            transport,
            state,
            notices,
            config: self.config,
        })
    }
}

impl Default for TrailServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A Trailforge server, bound and ready.
///
/// Call [`run_until()`](Self::run_until) to start accepting connections.
pub struct TrailServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    notices: mpsc::UnboundedReceiver<RoomNotice>,
    config: ServerConfig,
}

impl TrailServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> TrailServerBuilder {
        TrailServerBuilder::new()
    }
}

impl<C: Codec> TrailServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Accepts connections and runs the maintenance jobs until `shutdown`
    /// resolves.
    ///
    /// On shutdown the jobs are stopped and the listener closed. Handlers
    /// already running finish on their own as their sockets close.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), TrailforgeError>
    where
        F: Future<Output = ()>,
    {
        info!(addr = %self.config.bind_addr, "Trailforge server running");

        let sweep = {
            let state = self.state.clone();
            PeriodicTask::spawn(
                PeriodicConfig::every("room-sweep", self.config.sweep_interval),
                move || {
                    let state = state.clone();
                    async move { state.sweep().await }
                },
            )
        };
        let decay = {
            let state = self.state.clone();
            PeriodicTask::spawn(
                PeriodicConfig::every("loot-decay", self.config.decay_interval),
                move || {
                    let state = state.clone();
                    async move { state.decay().await }
                },
            )
        };
        let relay = tokio::spawn(relay_notices(self.state.clone(), self.notices));

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                },
            }
        }

        sweep.stop();
        decay.stop();
        relay.abort();
        self.transport.shutdown().await?;
        info!(sweeps = sweep.runs(), decays = decay.runs(), "Trailforge server stopped");
        Ok(())
    }
}
