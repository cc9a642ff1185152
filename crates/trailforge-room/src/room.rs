//! A room: members, one or many turn engines, and the turn clock, all
//! behind a single lock.
//!
//! Every mutation takes the write half of the room's `RwLock`; snapshots
//! and lobby listings take the read half. Nothing here sends to a client.
//! Mutating calls hand back an [`Outcome`] and the caller publishes it
//! after the lock is gone. The one caller that isn't a client (the turn
//! timer) pushes its outcome into the notice channel, again only after
//! releasing the lock.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use trailforge_engine::rules::FORT_INTERVAL;
use trailforge_engine::{DecayRates, EngineError, GameState, LootSite, MainAction, Player};
use trailforge_protocol::{
    ActionKind, ConnectionId, LobbyEntry, MemberView, PerPlayerSnapshot, PlayerId, PlayerJourney,
    RoomHeader, RoomId, RoomMode, RoomSnapshot, RoomStatus, SharedSnapshot, Tactic, TurnPhase,
    SNAPSHOT_VERSION,
};
use trailforge_timer::TurnTimer;

use crate::records::TRAIL_SAVE_VERSION;
use crate::{
    Departure, JoinRequest, Joined, Outcome, Persist, RoomCommand, RoomConfig, RoomError,
    RoomNotice, ScoreEntry, TrailSave,
};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// A connected client and the player it speaks for.
#[derive(Debug, Clone)]
struct Member {
    id: PlayerId,
    name: String,
    connection: ConnectionId,
}

/// The turn engines a room owns.
#[derive(Debug)]
enum Journeys {
    /// Scheduled: everyone rides one wagon.
    Shared(GameState),
    /// Continuous: one wagon per player, keyed by the player riding it.
    PerPlayer(BTreeMap<PlayerId, GameState>),
}

/// Everything guarded by the room lock.
#[derive(Debug)]
struct RoomInner {
    status: RoomStatus,
    owner: Option<PlayerId>,
    members: Vec<Member>,
    /// Lowercased names of players who died on this run and logged out.
    banned: HashSet<String>,
    max_players: Option<usize>,
    journeys: Journeys,
    loot: Vec<LootSite>,
    won: bool,
    timer: TurnTimer,
}

impl RoomInner {
    fn member(&self, id: PlayerId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    fn set_connected(&mut self, id: PlayerId, connected: bool) {
        match &mut self.journeys {
            Journeys::Shared(game) => game.set_connected(id, connected),
            Journeys::PerPlayer(engines) => {
                if let Some(game) = engines.get_mut(&id) {
                    game.set_connected(id, connected);
                }
            }
        }
    }

    /// The player's display name as the engine knows it, falling back to
    /// the member list.
    fn name_of(&self, id: PlayerId) -> Option<String> {
        let seated = match &self.journeys {
            Journeys::Shared(game) => game.player(id),
            Journeys::PerPlayer(engines) => engines.get(&id).and_then(|g| g.player(id)),
        };
        seated
            .map(|p| p.name.clone())
            .or_else(|| self.member(id).map(|m| m.name.clone()))
    }
}

fn status_code(status: RoomStatus) -> u8 {
    match status {
        RoomStatus::Waiting => 0,
        RoomStatus::Playing => 1,
        RoomStatus::Finished => 2,
    }
}

fn status_from_code(code: u8) -> RoomStatus {
    match code {
        0 => RoomStatus::Waiting,
        1 => RoomStatus::Playing,
        _ => RoomStatus::Finished,
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One room of the trail.
///
/// Rooms are always handled through an `Arc`. A few facts the sweeper
/// needs (member count, pending joins, status and when it last changed)
/// are mirrored in atomics so the room directory can judge a room
/// without ever taking its lock.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    mode: RoomMode,
    password: Option<String>,
    cap: Option<usize>,
    created: Instant,
    config: Arc<RoomConfig>,
    dice_counter: AtomicU64,
    members: AtomicUsize,
    reservations: AtomicUsize,
    status: AtomicU8,
    status_changed_ms: AtomicU64,
    notices: mpsc::UnboundedSender<RoomNotice>,
    me: Weak<Room>,
    inner: RwLock<RoomInner>,
}

impl Room {
    /// A lobby room sharing one wagon among its members.
    pub fn scheduled(
        id: RoomId,
        name: impl Into<String>,
        password: Option<String>,
        max_players: Option<usize>,
        config: Arc<RoomConfig>,
        notices: mpsc::UnboundedSender<RoomNotice>,
    ) -> Arc<Self> {
        let password = password.filter(|p| !p.is_empty());
        let max_players = max_players.filter(|&n| n > 0);
        Self::build(id, name.into(), RoomMode::Scheduled, password, max_players, config, notices)
    }

    /// The open trail: every member drives their own wagon.
    pub fn continuous(
        id: RoomId,
        name: impl Into<String>,
        config: Arc<RoomConfig>,
        notices: mpsc::UnboundedSender<RoomNotice>,
    ) -> Arc<Self> {
        Self::build(id, name.into(), RoomMode::Continuous, None, None, config, notices)
    }

    fn build(
        id: RoomId,
        name: String,
        mode: RoomMode,
        password: Option<String>,
        cap: Option<usize>,
        config: Arc<RoomConfig>,
        notices: mpsc::UnboundedSender<RoomNotice>,
    ) -> Arc<Self> {
        let dice_counter = AtomicU64::new(0);
        let journeys = match mode {
            RoomMode::Scheduled => {
                Journeys::Shared(GameState::new(config.dice.roll(&dice_counter)))
            }
            RoomMode::Continuous => Journeys::PerPlayer(BTreeMap::new()),
        };
        Arc::new_cyclic(|me| Self {
            id,
            name,
            mode,
            password,
            cap,
            created: Instant::now(),
            config,
            dice_counter,
            members: AtomicUsize::new(0),
            reservations: AtomicUsize::new(0),
            status: AtomicU8::new(status_code(RoomStatus::Waiting)),
            status_changed_ms: AtomicU64::new(0),
            notices,
            me: me.clone(),
            inner: RwLock::new(RoomInner {
                status: RoomStatus::Waiting,
                owner: None,
                members: Vec::new(),
                banned: HashSet::new(),
                max_players: cap,
                journeys,
                loot: Vec::new(),
                won: false,
                timer: TurnTimer::new(),
            }),
        })
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> RoomMode {
        self.mode
    }

    /// Status as last published; may trail the locked state briefly.
    pub fn status(&self) -> RoomStatus {
        status_from_code(self.status.load(Ordering::Acquire))
    }

    /// Connected members, without taking the lock.
    pub fn member_count(&self) -> usize {
        self.members.load(Ordering::Acquire)
    }

    /// Joins announced through [`reserve`](Self::reserve) but not finished.
    pub fn pending_joins(&self) -> usize {
        self.reservations.load(Ordering::Acquire)
    }

    pub fn created_at(&self) -> Instant {
        self.created
    }

    /// How long the room has been in its current status.
    pub fn time_in_status(&self) -> std::time::Duration {
        let since = std::time::Duration::from_millis(self.status_changed_ms.load(Ordering::Acquire));
        self.created.elapsed().saturating_sub(since)
    }

    /// Marks a join in flight so the sweeper leaves the room alone.
    pub fn reserve(self: &Arc<Self>) -> Reservation {
        self.reservations.fetch_add(1, Ordering::AcqRel);
        Reservation { room: self.clone() }
    }

    fn set_status(&self, inner: &mut RoomInner, status: RoomStatus) {
        if inner.status == status {
            return;
        }
        inner.status = status;
        self.status.store(status_code(status), Ordering::Release);
        let elapsed = self.created.elapsed().as_millis() as u64;
        self.status_changed_ms.store(elapsed, Ordering::Release);
        info!(room_id = %self.id, %status, "room status changed");
    }

    fn sync_members(&self, inner: &RoomInner) {
        self.members.store(inner.members.len(), Ordering::Release);
    }

    fn fresh_engine(&self) -> GameState {
        GameState::new(self.config.dice.roll(&self.dice_counter))
    }

    // -----------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------

    /// Seats a player, or hands their seat to a new connection.
    ///
    /// A player already in the room keeps their wagon and only the
    /// connection changes. Otherwise the password (unless resumed), the
    /// ban list, and the player cap are checked before anything changes.
    pub async fn join(&self, req: JoinRequest) -> Result<Joined, RoomError> {
        let mut inner = self.inner.write().await;

        if let Some(member) = inner.members.iter_mut().find(|m| m.id == req.player_id) {
            let previous = std::mem::replace(&mut member.connection, req.connection);
            let replaced = (previous != req.connection).then_some(previous);
            inner.set_connected(req.player_id, true);
            debug!(room_id = %self.id, player_id = %req.player_id, "member reconnected");
            return Ok(Joined {
                returning: true,
                replaced,
                started: false,
            });
        }

        let seated = match &inner.journeys {
            Journeys::Shared(game) => game.player(req.player_id).is_some(),
            Journeys::PerPlayer(engines) => engines.contains_key(&req.player_id),
        };
        if !seated {
            self.admit(&inner, &req)?;
        }

        let started = match self.mode {
            RoomMode::Scheduled => self.seat_shared(&mut inner, &req, seated),
            RoomMode::Continuous => self.seat_own_wagon(&mut inner, &req, seated),
        };

        inner.members.push(Member {
            id: req.player_id,
            name: req.name.clone(),
            connection: req.connection,
        });
        if self.mode == RoomMode::Scheduled && inner.owner.is_none() {
            inner.owner = Some(req.player_id);
        }
        self.sync_members(&inner);
        info!(
            room_id = %self.id,
            player_id = %req.player_id,
            name = %req.name,
            members = inner.members.len(),
            "player joined"
        );

        Ok(Joined {
            returning: seated,
            replaced: None,
            started,
        })
    }

    /// Entry checks for a player the room has never seated.
    fn admit(&self, inner: &RoomInner, req: &JoinRequest) -> Result<(), RoomError> {
        if let Some(password) = &self.password {
            if !req.resumed && req.password.as_deref() != Some(password.as_str()) {
                return Err(RoomError::WrongPassword);
            }
        }
        if inner.banned.contains(&req.name.to_lowercase()) {
            return Err(RoomError::Banned(req.name.clone()));
        }
        if let Some(cap) = inner.max_players {
            if inner.members.len() >= cap {
                return Err(RoomError::Full(self.id.clone()));
            }
        }
        Ok(())
    }

    /// Returns `true` if this join set the wagon rolling.
    fn seat_shared(&self, inner: &mut RoomInner, req: &JoinRequest, seated: bool) -> bool {
        let status = inner.status;
        let Journeys::Shared(game) = &mut inner.journeys else {
            return false;
        };
        let before = game.current_player_id();
        if seated {
            game.set_connected(req.player_id, true);
        } else {
            game.add_player(Player::human(req.player_id, req.name.clone()));
        }

        match status {
            RoomStatus::Waiting => {
                game.outfit();
                game.begin();
                self.set_status(inner, RoomStatus::Playing);
                self.arm_turn(inner);
                true
            }
            RoomStatus::Playing => {
                if game.current_player_id() != before {
                    self.arm_turn(inner);
                }
                false
            }
            RoomStatus::Finished => false,
        }
    }

    /// Finds or creates the player's own wagon on the open trail.
    fn seat_own_wagon(&self, inner: &mut RoomInner, req: &JoinRequest, seated: bool) -> bool {
        let members: HashSet<PlayerId> = inner.members.iter().map(|m| m.id).collect();
        let Journeys::PerPlayer(engines) = &mut inner.journeys else {
            return false;
        };

        if seated {
            if let Some(game) = engines.get_mut(&req.player_id) {
                game.set_connected(req.player_id, true);
            }
        } else if let Some(previous) = engines
            .iter()
            .find(|(id, game)| !members.contains(*id) && game.player_named(&req.name).is_some())
            .map(|(id, _)| *id)
        {
            // A wagon saved before a restart, picked up by a new session.
            if let Some(mut game) = engines.remove(&previous) {
                game.reassign_player(previous, req.player_id);
                game.set_connected(req.player_id, true);
                engines.insert(req.player_id, game);
                info!(room_id = %self.id, from = %previous, to = %req.player_id, "restored wagon reclaimed");
            }
        } else {
            let mut game = self.fresh_engine();
            game.add_player(Player::human(req.player_id, req.name.clone()));
            game.outfit();
            game.begin();
            engines.insert(req.player_id, game);
        }

        if inner.status == RoomStatus::Waiting {
            self.set_status(inner, RoomStatus::Playing);
            return true;
        }
        false
    }

    /// Drops a connection. The player keeps their seat and wagon; in a
    /// scheduled room their turn simply runs out if they don't come back.
    ///
    /// Returns `None` if the connection no longer speaks for the player.
    pub async fn leave(&self, player: PlayerId, connection: ConnectionId) -> Option<Departure> {
        let mut inner = self.inner.write().await;
        let idx = inner
            .members
            .iter()
            .position(|m| m.id == player && m.connection == connection)?;
        let member = inner.members.remove(idx);
        inner.set_connected(player, false);
        self.hand_over_ownership(&mut inner, player);
        self.sync_members(&inner);
        info!(room_id = %self.id, player_id = %player, name = %member.name, "player left");

        Some(Departure {
            outcome: Outcome::new(
                &member.name,
                "leave",
                format!("{} lost the trail (disconnected).", member.name),
            ),
            name: member.name,
            connection: Some(member.connection),
            now_empty: inner.members.is_empty(),
        })
    }

    /// Takes a player off the trail for good.
    ///
    /// A scheduled player whose party is already dead is banned by name
    /// until the next reset, and the room's cap shrinks by one.
    pub async fn logout(&self, player: PlayerId) -> Result<Departure, RoomError> {
        let mut inner = self.inner.write().await;
        let name = inner.name_of(player).ok_or(RoomError::NotMember(player))?;

        let dead = match &inner.journeys {
            Journeys::Shared(game) => game.player(player).is_some_and(|p| !p.alive),
            Journeys::PerPlayer(engines) => engines
                .get(&player)
                .and_then(|g| g.player(player))
                .is_some_and(|p| !p.alive),
        };
        if dead && inner.status == RoomStatus::Playing {
            if let Some(cap) = inner.max_players.as_mut() {
                *cap = cap.saturating_sub(1);
            }
            if self.mode == RoomMode::Scheduled {
                inner.banned.insert(name.to_lowercase());
                info!(room_id = %self.id, %name, "dead player logged out; banned until reset");
            }
        }

        let outcome = Outcome::new(&name, "logout", format!("{name} has left the trail."));
        Ok(self.remove_player(&mut inner, player, name, outcome))
    }

    /// Removes `target` on the owner's say-so. Returns the connection the
    /// caller should close.
    pub async fn kick(&self, requester: PlayerId, target: PlayerId) -> Result<Departure, RoomError> {
        let mut inner = self.inner.write().await;
        if inner.owner != Some(requester) {
            return Err(RoomError::NotOwner);
        }
        if requester == target {
            return Err(RoomError::KickSelf);
        }
        let name = inner
            .member(target)
            .map(|m| m.name.clone())
            .ok_or(RoomError::NotMember(target))?;

        info!(room_id = %self.id, %requester, %target, "player kicked");
        let outcome = Outcome::new(&name, "kick", format!("{name} was sent packing by the wagon master."));
        Ok(self.remove_player(&mut inner, target, name, outcome))
    }

    fn remove_player(
        &self,
        inner: &mut RoomInner,
        player: PlayerId,
        name: String,
        mut outcome: Outcome,
    ) -> Departure {
        let connection = inner
            .members
            .iter()
            .position(|m| m.id == player)
            .map(|idx| inner.members.remove(idx).connection);
        self.hand_over_ownership(inner, player);

        match &mut inner.journeys {
            Journeys::Shared(game) => {
                let removed = game.remove_player(player);
                let held_turn = removed.is_some_and(|r| r.held_turn);
                if game.is_finished() && inner.status == RoomStatus::Playing {
                    outcome.scores = self.shared_scores(game);
                    self.finish(inner);
                } else if held_turn {
                    self.arm_turn(inner);
                }
            }
            Journeys::PerPlayer(engines) => {
                if engines.remove(&player).is_some() {
                    outcome.persist = Persist::Save;
                }
            }
        }

        self.sync_members(inner);
        Departure {
            name,
            connection,
            now_empty: inner.members.is_empty(),
            outcome,
        }
    }

    fn hand_over_ownership(&self, inner: &mut RoomInner, leaving: PlayerId) {
        if inner.owner != Some(leaving) {
            return;
        }
        inner.owner = inner.members.first().map(|m| m.id);
        if let Some(owner) = inner.owner {
            info!(room_id = %self.id, %owner, "ownership transferred");
        }
    }

    // -----------------------------------------------------------------
    // Play
    // -----------------------------------------------------------------

    /// Applies one member's gameplay command.
    pub async fn apply(&self, player: PlayerId, command: RoomCommand) -> Result<Outcome, RoomError> {
        let mut inner = self.inner.write().await;
        let label = command.label();
        let result = match self.mode {
            RoomMode::Scheduled => self.apply_shared(&mut inner, player, command),
            RoomMode::Continuous => self.apply_own_wagon(&mut inner, player, command),
        };
        if let Err(e) = &result {
            debug!(room_id = %self.id, player_id = %player, action = label, error = %e, "command rejected");
        }
        result
    }

    fn apply_shared(
        &self,
        inner: &mut RoomInner,
        player: PlayerId,
        command: RoomCommand,
    ) -> Result<Outcome, RoomError> {
        let Journeys::Shared(game) = &mut inner.journeys else {
            return Err(RoomError::WrongMode("this room has no shared wagon"));
        };
        if matches!(command, RoomCommand::Action { action: ActionKind::Start, .. }) {
            return Err(RoomError::WrongMode(
                "the wagon train is already under way; reset it once the journey ends",
            ));
        }
        if matches!(command, RoomCommand::ClaimLoot { .. }) {
            return Err(RoomError::WrongMode("abandoned wagons are only found on the open trail"));
        }
        if game.is_finished() {
            return Err(EngineError::JourneyOver.into());
        }
        if game.current_player_id() != Some(player) {
            return Err(RoomError::NotYourTurn);
        }

        let actor = game
            .player(player)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let label = command.label();
        let narrative = drive(game, player, command)?;
        let mut outcome = Outcome::new(&actor, label, narrative);
        self.settle_shared(inner, &mut outcome);
        Ok(outcome)
    }

    /// Moves a shared journey on after its engine changed: finish it, pass
    /// the turn, or leave the clock alone while a decision is pending.
    fn settle_shared(&self, inner: &mut RoomInner, outcome: &mut Outcome) {
        let Journeys::Shared(game) = &mut inner.journeys else {
            return;
        };
        if !game.is_finished() && game.phase() == TurnPhase::MainMenu {
            game.next_turn();
            if !game.is_finished() && game.turn() % FORT_INTERVAL == 0 {
                game.set_fort_available(true);
            }
        }
        if game.is_finished() {
            outcome.scores = self.shared_scores(game);
            self.finish(inner);
            return;
        }
        match game.phase() {
            TurnPhase::Fort => inner.timer.cancel(),
            TurnPhase::MainMenu => self.arm_turn(inner),
            TurnPhase::Hunting | TurnPhase::Riders | TurnPhase::Finished => {}
        }
    }

    fn apply_own_wagon(
        &self,
        inner: &mut RoomInner,
        player: PlayerId,
        command: RoomCommand,
    ) -> Result<Outcome, RoomError> {
        if inner.won {
            return Err(EngineError::JourneyOver.into());
        }
        let RoomInner { journeys, loot, .. } = &mut *inner;
        let Journeys::PerPlayer(engines) = journeys else {
            return Err(RoomError::WrongMode("this room has no private wagons"));
        };
        let game = engines.get_mut(&player).ok_or(RoomError::NoJourney)?;
        let actor = game
            .player(player)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let was_alive = game.player(player).is_some_and(|p| p.alive);
        let label = command.label();
        let now = Utc::now();

        // A fresh start and a scavenge leave the turn counter alone.
        let (narrative, advances) = match command {
            RoomCommand::Action { action: ActionKind::Start, .. } => (game.restart(player)?, false),
            RoomCommand::ClaimLoot { site_id } => {
                let site = loot
                    .iter_mut()
                    .find(|s| s.id == site_id)
                    .ok_or(EngineError::UnknownLootSite(site_id))?;
                (game.scavenge(player, site, now)?, false)
            }
            other => (drive(game, player, other)?, true),
        };

        let mut outcome = Outcome::new(&actor, label, narrative);
        outcome.persist = Persist::Save;

        if was_alive && game.player(player).is_some_and(|p| !p.alive) {
            if let Some(site) = LootSite::abandoned_by(game, player, now) {
                info!(room_id = %self.id, player_id = %player, site = %site.id, "wagon abandoned");
                loot.push(site);
            }
        }

        if game.is_won() {
            outcome.scores = engines
                .values()
                .flat_map(|g| self.shared_scores(g))
                .collect();
            outcome.persist = Persist::Clear;
            inner.won = true;
            self.finish(inner);
            return Ok(outcome);
        }
        if advances && !game.is_finished() && game.phase() == TurnPhase::MainMenu {
            game.next_turn();
            if game.turn() % FORT_INTERVAL == 0 {
                game.set_fort_available(true);
            }
        }
        Ok(outcome)
    }

    fn shared_scores(&self, game: &GameState) -> Vec<ScoreEntry> {
        game.players()
            .iter()
            .filter(|p| p.is_human())
            .map(|p| ScoreEntry {
                name: p.name.clone(),
                won: game.is_won(),
                mileage: game.mileage(),
                turns: game.turn(),
                mode: self.mode,
            })
            .collect()
    }

    fn finish(&self, inner: &mut RoomInner) {
        inner.timer.cancel();
        self.set_status(inner, RoomStatus::Finished);
    }

    /// Starts the room over once its journey has ended.
    pub async fn reset(&self, requester: PlayerId) -> Result<Outcome, RoomError> {
        let mut inner = self.inner.write().await;
        let actor = inner
            .member(requester)
            .map(|m| m.name.clone())
            .ok_or(RoomError::NotMember(requester))?;

        let outcome = match self.mode {
            RoomMode::Scheduled => {
                let Journeys::Shared(game) = &inner.journeys else {
                    return Err(RoomError::WrongMode("this room has no shared wagon"));
                };
                if !game.is_finished() {
                    return Err(RoomError::StillRunning);
                }
                self.reset_shared(&mut inner);
                Outcome::new(
                    &actor,
                    "reset",
                    "A new wagon train gathers in Independence, Missouri.".to_string(),
                )
            }
            RoomMode::Continuous => {
                if !inner.won {
                    return Err(RoomError::NotWon);
                }
                if let Journeys::PerPlayer(engines) = &mut inner.journeys {
                    for (id, game) in engines.iter_mut() {
                        game.restart(*id)?;
                    }
                }
                inner.won = false;
                inner.loot.clear();
                self.set_status(&mut inner, RoomStatus::Playing);
                let mut outcome = Outcome::new(
                    &actor,
                    "reset",
                    "Word of the arrival spreads east. Every wagon sets out again.".to_string(),
                );
                outcome.persist = Persist::Save;
                outcome
            }
        };
        info!(room_id = %self.id, %requester, "room reset");
        Ok(outcome)
    }

    fn reset_shared(&self, inner: &mut RoomInner) {
        inner.timer.cancel();
        inner.banned.clear();
        inner.max_players = self.cap;
        let mut game = self.fresh_engine();
        for member in &inner.members {
            game.add_player(Player::human(member.id, member.name.clone()));
        }
        let anyone = !inner.members.is_empty();
        if anyone {
            game.outfit();
            game.begin();
        }
        inner.journeys = Journeys::Shared(game);
        if anyone {
            self.set_status(inner, RoomStatus::Playing);
            self.arm_turn(inner);
        } else {
            self.set_status(inner, RoomStatus::Waiting);
        }
    }

    // -----------------------------------------------------------------
    // Turn clock
    // -----------------------------------------------------------------

    /// Arms the turn clock for whoever now holds the shared turn, or
    /// disarms it if nobody does.
    fn arm_turn(&self, inner: &mut RoomInner) {
        let expected = match &inner.journeys {
            Journeys::Shared(game) if inner.status == RoomStatus::Playing => game.current_player_id(),
            _ => None,
        };
        let Some(expected) = expected else {
            inner.timer.cancel();
            return;
        };
        let room = self.me.clone();
        inner.timer.arm(self.config.turn_time, move |epoch| async move {
            if let Some(room) = room.upgrade() {
                room.expire_turn(expected, epoch).await;
            }
        });
    }

    /// Runs when a turn clock armed for `expected` at `epoch` runs out.
    ///
    /// Returns `false` (and changes nothing) if the clock was re-armed or
    /// cancelled meanwhile, or if `expected` no longer holds the turn.
    /// Otherwise the penalty is applied, the turn moves on, and the
    /// outcome goes out as a [`RoomNotice`] once the lock is released.
    pub async fn expire_turn(&self, expected: PlayerId, epoch: u64) -> bool {
        let outcome = {
            let mut inner = self.inner.write().await;
            if !inner.timer.release(epoch) {
                debug!(room_id = %self.id, %expected, epoch, "stale turn timer ignored");
                return false;
            }
            match self.time_out(&mut inner, expected) {
                Some(outcome) => outcome,
                None => {
                    debug!(room_id = %self.id, %expected, "turn already moved on");
                    return false;
                }
            }
        };

        info!(room_id = %self.id, player_id = %expected, "turn timed out");
        let notice = RoomNotice {
            room_id: self.id.clone(),
            outcome,
        };
        if self.notices.send(notice).is_err() {
            warn!(room_id = %self.id, "notice channel closed; timeout not published");
        }
        true
    }

    fn time_out(&self, inner: &mut RoomInner, expected: PlayerId) -> Option<Outcome> {
        if inner.status != RoomStatus::Playing {
            return None;
        }
        let Journeys::Shared(game) = &mut inner.journeys else {
            return None;
        };
        if game.is_finished() || game.current_player_id() != Some(expected) {
            return None;
        }
        let name = game.player(expected)?.name.clone();
        let story = game
            .apply_timeout_penalty(expected, self.config.timeout_damage)
            .ok()?;
        let mut outcome = Outcome::new(&name, "timeout", format!("Time's up! {story}"));
        self.settle_shared(inner, &mut outcome);
        Some(outcome)
    }

    // -----------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------

    /// The full picture of the room for its members.
    pub async fn snapshot(&self) -> RoomSnapshot {
        let inner = self.inner.read().await;
        let header = RoomHeader {
            version: SNAPSHOT_VERSION,
            room_id: self.id.clone(),
            name: self.name.clone(),
            status: inner.status,
            owner: inner.owner,
            password_protected: self.password.is_some(),
            max_players: inner.max_players,
            members: inner
                .members
                .iter()
                .map(|m| MemberView {
                    id: m.id,
                    name: m.name.clone(),
                })
                .collect(),
        };

        match &inner.journeys {
            Journeys::Shared(game) => {
                let turn_deadline = inner
                    .timer
                    .remaining()
                    .and_then(|left| chrono::Duration::from_std(left).ok())
                    .map(|left| Utc::now() + left);
                RoomSnapshot::Scheduled(SharedSnapshot {
                    header,
                    journey: game.journey_view(),
                    players: game.player_views(),
                    current_player: game.current_player_id(),
                    turn_deadline,
                })
            }
            Journeys::PerPlayer(engines) => RoomSnapshot::Continuous(PerPlayerSnapshot {
                header,
                journeys: engines
                    .values()
                    .filter_map(|game| {
                        let player = game.players().first()?;
                        Some(PlayerJourney {
                            player: player.view(),
                            journey: game.journey_view(),
                        })
                    })
                    .collect(),
                loot_sites: inner.loot.iter().map(LootSite::view).collect(),
                won: inner.won,
            }),
        }
    }

    pub async fn lobby_entry(&self) -> LobbyEntry {
        let inner = self.inner.read().await;
        LobbyEntry {
            room_id: self.id.clone(),
            name: self.name.clone(),
            mode: self.mode,
            status: inner.status,
            players: inner.members.len(),
            max_players: inner.max_players,
            password_protected: self.password.is_some(),
        }
    }

    /// The connection currently speaking for `player`, if they are a member.
    pub async fn connection_of(&self, player: PlayerId) -> Option<ConnectionId> {
        let inner = self.inner.read().await;
        inner.member(player).map(|m| m.connection)
    }

    // -----------------------------------------------------------------
    // Loot and persistence (continuous rooms)
    // -----------------------------------------------------------------

    /// Spoils every unclaimed loot site by one step. Returns how many
    /// sites changed.
    pub async fn decay_loot(&self, rates: &DecayRates) -> usize {
        let mut inner = self.inner.write().await;
        inner
            .loot
            .iter_mut()
            .map(|site| site.decay(rates))
            .filter(|&changed| changed)
            .count()
    }

    /// The room's wagons and loot in save-file form. `None` for scheduled
    /// rooms, which are never saved.
    pub async fn saved_state(&self) -> Option<TrailSave> {
        let inner = self.inner.read().await;
        let Journeys::PerPlayer(engines) = &inner.journeys else {
            return None;
        };
        Some(TrailSave {
            version: TRAIL_SAVE_VERSION,
            journeys: engines.values().map(GameState::to_saved).collect(),
            loot_sites: inner.loot.clone(),
            won: inner.won,
            saved_at: Utc::now(),
        })
    }

    /// Seeds a continuous room from a save. Every restored traveller starts
    /// out disconnected until someone with their name joins.
    ///
    /// Returns the number of wagons restored.
    pub async fn restore(&self, save: TrailSave) -> usize {
        let mut inner = self.inner.write().await;
        let restored: BTreeMap<PlayerId, GameState> = save
            .journeys
            .into_iter()
            .filter_map(|saved| {
                let mut game = GameState::from_saved(saved, self.config.dice.roll(&self.dice_counter));
                let id = game.players().first()?.id;
                game.set_connected(id, false);
                Some((id, game))
            })
            .collect();
        let count = restored.len();

        let Journeys::PerPlayer(engines) = &mut inner.journeys else {
            warn!(room_id = %self.id, "ignoring trail save for a scheduled room");
            return 0;
        };
        *engines = restored;
        inner.loot = save.loot_sites;
        inner.won = save.won;
        let status = if inner.won {
            RoomStatus::Finished
        } else if count > 0 {
            RoomStatus::Playing
        } else {
            RoomStatus::Waiting
        };
        self.set_status(&mut inner, status);
        info!(room_id = %self.id, wagons = count, loot = inner.loot.len(), "trail restored");
        count
    }

    /// The largest player id seated in this room, so a fresh session
    /// directory can mint ids past it.
    pub async fn highest_player_id(&self) -> Option<PlayerId> {
        let inner = self.inner.read().await;
        match &inner.journeys {
            Journeys::Shared(game) => game.players().iter().map(|p| p.id).max(),
            Journeys::PerPlayer(engines) => engines.keys().next_back().copied(),
        }
    }

    /// Returns `true` while the room's turn clock is running.
    pub async fn turn_clock_armed(&self) -> bool {
        self.inner.read().await.timer.is_armed()
    }
}

/// Runs a command against one engine. Mode-specific commands are handled
/// by the caller.
fn drive(game: &mut GameState, player: PlayerId, command: RoomCommand) -> Result<String, RoomError> {
    let story = match command {
        RoomCommand::Action { action: ActionKind::Hunt, .. } => {
            game.process_action(player, MainAction::Hunt)?
        }
        RoomCommand::Action { action: ActionKind::Continue, eating } => game.process_action(
            player,
            MainAction::Continue {
                eating: eating.unwrap_or_default(),
            },
        )?,
        RoomCommand::Action { action: ActionKind::Start, .. } | RoomCommand::ClaimLoot { .. } => {
            return Err(RoomError::WrongMode("not available in this room"));
        }
        RoomCommand::HuntShot { reaction_ms } => game.resolve_hunt_shot(player, reaction_ms)?,
        RoomCommand::RiderTactic { code } => {
            let tactic = Tactic::from_code(code).unwrap_or(Tactic::Proceed);
            game.resolve_rider_tactic(player, tactic, None)?
        }
        RoomCommand::FortEnter => game.enter_fort(player)?,
        RoomCommand::FortBuy { item, qty } => game.buy(player, item, qty)?,
        RoomCommand::FortSell { item, qty } => game.sell(player, item, qty)?,
        RoomCommand::FortLeave => game.leave_fort(player)?,
    };
    Ok(story)
}

// ---------------------------------------------------------------------------
// Reservation
// ---------------------------------------------------------------------------

/// Keeps a room off the sweeper's list while a join is in flight.
#[derive(Debug)]
pub struct Reservation {
    room: Arc<Room>,
}

impl Reservation {
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.room.reservations.fetch_sub(1, Ordering::AcqRel);
    }
}
