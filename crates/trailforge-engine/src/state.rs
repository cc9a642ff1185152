//! The turn engine proper: roster, rotation, travel, and turn completion.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use trailforge_protocol::{EatingTier, PlayerId, Resource, Resources, TurnPhase};

use crate::hazards::EventTable;
use crate::party::Player;
use crate::riders;
use crate::rules::*;
use crate::{Dice, EngineError};

/// An interactive decision the engine is waiting on.
///
/// Each variant carries exactly what the rest of the turn needs once the
/// player answers, so there is no separate phase field to keep in sync.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pending {
    /// Nothing pending; the current player picks from the main menu.
    #[default]
    None,
    /// Ammunition is spent; waiting for the reflex-test result.
    AwaitingHunt,
    /// Riders are in sight; the rest of the turn resumes after the tactic
    /// with the eating tier chosen before they appeared.
    AwaitingRiderTactic {
        hostile: bool,
        riders: u32,
        eating: EatingTier,
    },
    /// Trading at a fort; leaving hands the turn on.
    AtFort,
}

/// A main-menu choice the engine resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAction {
    Hunt,
    Continue { eating: EatingTier },
}

/// What [`GameState::remove_player`] took out of the roster.
#[derive(Debug, Clone)]
pub struct RemovedPlayer {
    pub player: Player,
    /// The removed player was holding the turn.
    pub held_turn: bool,
}

/// One wagon train's journey.
///
/// In scheduled rooms every member rides the same wagon and takes turns;
/// in continuous rooms each member gets a `GameState` with a roster of one.
#[derive(Debug, Clone)]
pub struct GameState {
    pub(crate) players: Vec<Player>,
    pub(crate) current: usize,
    pub(crate) turn: u32,
    pub(crate) week: u32,
    pub(crate) mileage: f64,
    pub(crate) resources: Resources,
    pub(crate) oxen: f64,
    pub(crate) pending: Pending,
    pub(crate) fort_available: bool,
    pub(crate) finished: bool,
    pub(crate) won: bool,
    pub(crate) arrival_date: Option<String>,
    pub(crate) events: EventTable,
    pub(crate) dice: Dice,
}

impl GameState {
    /// An empty journey: no players, an empty wagon, turn 0.
    pub fn new(dice: Dice) -> Self {
        Self {
            players: Vec::new(),
            current: 0,
            turn: 0,
            week: 0,
            mileage: 0.0,
            resources: Resources::default(),
            oxen: 0.0,
            pending: Pending::None,
            fort_available: false,
            finished: false,
            won: false,
            arrival_date: None,
            events: EventTable::standard(),
            dice,
        }
    }

    /// Replaces the random-event table.
    pub fn with_events(mut self, events: EventTable) -> Self {
        self.events = events;
        self
    }

    // -----------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------

    /// Adds a player to the roster. Returns `false` if the id is taken.
    ///
    /// If nobody currently holds the turn, the first eligible human
    /// (possibly the newcomer) takes it.
    pub fn add_player(&mut self, player: Player) -> bool {
        if self.index_of(player.id).is_some() {
            return false;
        }
        self.players.push(player);
        if !self.finished && !self.current_is_turn_holder() {
            if let Some(i) = self.turn_holder_from(0) {
                self.current = i;
            }
        }
        true
    }

    /// Removes a player and re-clamps the turn to a valid human.
    ///
    /// If the removed player held the turn, any pending interaction is
    /// dropped and the next human in seat order takes over. When no human
    /// is left alive on a journey already under way, it is finished.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<RemovedPlayer> {
        let idx = self.index_of(id)?;
        let held_turn = idx == self.current && !self.finished;
        let player = self.players.remove(idx);

        if held_turn {
            self.pending = Pending::None;
        }
        if self.players.is_empty() {
            self.current = 0;
            return Some(RemovedPlayer { player, held_turn });
        }

        if held_turn {
            // The seat after the removed one slid down into `idx`.
            self.current = idx % self.players.len();
        } else if idx < self.current {
            self.current -= 1;
        }

        if !self.finished && !self.current_is_turn_holder() {
            match self.turn_holder_from(self.current) {
                Some(i) => self.current = i,
                None if self.turn > 0 => self.finish_without_winner(),
                None => {}
            }
        }

        Some(RemovedPlayer { player, held_turn })
    }

    /// Marks a player's connection state, used only for display.
    pub fn set_connected(&mut self, id: PlayerId, connected: bool) {
        if let Some(idx) = self.index_of(id) {
            self.players[idx].connected = connected;
        }
    }

    /// Hands a seat to a new id, e.g. when a saved journey is picked up
    /// by a fresh session. Returns `false` if `from` is unknown or `to` is
    /// already seated.
    pub fn reassign_player(&mut self, from: PlayerId, to: PlayerId) -> bool {
        if self.index_of(to).is_some() {
            return false;
        }
        match self.index_of(from) {
            Some(idx) => {
                self.players[idx].id = to;
                true
            }
            None => false,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Finds a player by display name, ignoring case.
    pub fn player_named(&self, name: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// The player holding the turn, if the journey is still going.
    pub fn current_player(&self) -> Option<&Player> {
        if self.finished {
            return None;
        }
        self.players
            .get(self.current)
            .filter(|p| p.can_hold_turn())
    }

    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.current_player().map(|p| p.id)
    }

    fn current_is_turn_holder(&self) -> bool {
        self.players
            .get(self.current)
            .is_some_and(Player::can_hold_turn)
    }

    /// First living human at or after `start`, wrapping around.
    fn turn_holder_from(&self, start: usize) -> Option<usize> {
        let n = self.players.len();
        (0..n)
            .map(|step| (start + step) % n)
            .find(|&i| self.players[i].can_hold_turn())
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Loads the wagon with the standard starting outfit.
    pub fn outfit(&mut self) {
        self.oxen = START_OXEN;
        self.resources = Resources {
            food: START_FOOD,
            ammunition: START_AMMUNITION,
            clothing: START_CLOTHING,
            supplies: START_SUPPLIES,
            cash: START_CASH,
        };
    }

    /// Loads the wagon with a randomised purchase from the same $700
    /// budget, the way automated players shop in Independence. A purchase
    /// that overspends falls back to a fixed sensible outfit.
    pub fn outfit_automated(&mut self) {
        let oxen = 200.0 + 100.0 * self.dice.unit();
        let resources = Resources {
            food: 150.0 + 150.0 * self.dice.unit(),
            ammunition: 50.0 + 100.0 * self.dice.unit(),
            clothing: 25.0 + 30.0 * self.dice.unit(),
            supplies: 15.0 + 20.0 * self.dice.unit(),
            cash: 0.0,
        };
        let cash = START_CASH
            - oxen
            - resources.food
            - resources.ammunition
            - resources.clothing
            - resources.supplies;

        if cash < 0.0 {
            self.oxen = 200.0;
            self.resources = Resources {
                food: 200.0,
                ammunition: 100.0,
                clothing: 50.0,
                supplies: 30.0,
                cash: 120.0,
            };
        } else {
            self.oxen = oxen;
            self.resources = Resources { cash, ..resources };
        }
    }

    /// Starts (or restarts) the journey at turn 1 from the main menu.
    pub fn begin(&mut self) {
        self.turn = 1;
        self.week = 0;
        self.pending = Pending::None;
        self.fort_available = false;
        self.finished = false;
        self.won = false;
        self.arrival_date = None;
        match self.turn_holder_from(0) {
            Some(i) => self.current = i,
            None => {
                self.current = 0;
                if !self.players.is_empty() {
                    self.finished = true;
                }
            }
        }
    }

    /// Sends one player back to Independence with a fresh party and a
    /// fresh wagon. Used by continuous rooms, where the roster is one.
    pub fn restart(&mut self, id: PlayerId) -> Result<String, EngineError> {
        let idx = self
            .index_of(id)
            .ok_or(EngineError::UnknownPlayer(id))?;
        self.players[idx].reset_party();
        self.mileage = 0.0;
        if self.players[idx].is_human() {
            self.outfit();
        } else {
            self.outfit_automated();
        }
        self.begin();
        Ok(format!(
            "{} sets out from Independence, Missouri.",
            self.players[idx].name
        ))
    }

    /// Hands the turn to the next living human in seat order.
    ///
    /// Bumps the turn counter (and the week every fourth turn) and closes
    /// any fort that was in reach. If no human is left alive the journey
    /// is finished instead.
    pub fn next_turn(&mut self) {
        if self.finished {
            return;
        }
        self.turn += 1;
        if self.turn % 4 == 0 {
            self.week += 1;
        }
        self.fort_available = false;
        self.pending = Pending::None;

        let n = self.players.len();
        if n == 0 {
            return;
        }
        match self.turn_holder_from((self.current + 1) % n) {
            Some(i) => self.current = i,
            None => self.finish_without_winner(),
        }
    }

    /// Abandons any interactive decision and returns to the main menu.
    pub fn reset_to_main_menu(&mut self) {
        self.pending = Pending::None;
    }

    pub fn set_fort_available(&mut self, available: bool) {
        self.fort_available = available;
    }

    fn finish_without_winner(&mut self) {
        self.finished = true;
        self.won = false;
        self.pending = Pending::None;
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn phase(&self) -> TurnPhase {
        if self.finished {
            return TurnPhase::Finished;
        }
        match self.pending {
            Pending::None => TurnPhase::MainMenu,
            Pending::AwaitingHunt => TurnPhase::Hunting,
            Pending::AwaitingRiderTactic { .. } => TurnPhase::Riders,
            Pending::AtFort => TurnPhase::Fort,
        }
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn mileage(&self) -> f64 {
        self.mileage
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn oxen(&self) -> f64 {
        self.oxen
    }

    pub fn fort_available(&self) -> bool {
        self.fort_available
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_won(&self) -> bool {
        self.won
    }

    pub fn arrival_date(&self) -> Option<&str> {
        self.arrival_date.as_deref()
    }

    /// Overrides the odometer, e.g. when seeding from a saved game.
    pub fn set_mileage(&mut self, mileage: f64) {
        self.mileage = mileage.max(0.0);
    }

    /// Overrides the wagon's ledger. Negative values are floored.
    pub fn set_resources(&mut self, resources: Resources, oxen: f64) {
        self.resources = resources;
        self.oxen = oxen;
        self.clamp_resources();
    }

    // -----------------------------------------------------------------
    // Main-menu actions
    // -----------------------------------------------------------------

    /// Resolves a main-menu choice for `id`.
    ///
    /// Whose turn it is in a shared game is the caller's business; this
    /// only checks that the player is on the roster and alive, the journey
    /// is still going, and nothing else is pending.
    pub fn process_action(
        &mut self,
        id: PlayerId,
        action: MainAction,
    ) -> Result<String, EngineError> {
        let idx = self.actor(id)?;
        self.expect_main_menu("finish the current decision first")?;
        match action {
            MainAction::Hunt => self.start_hunt(idx),
            MainAction::Continue { eating } => {
                Ok(self.continue_travel(idx, eating))
            }
        }
    }

    /// Looks up a player who may act right now.
    pub(crate) fn actor(&self, id: PlayerId) -> Result<usize, EngineError> {
        if self.finished {
            return Err(EngineError::JourneyOver);
        }
        let idx = self
            .index_of(id)
            .ok_or(EngineError::UnknownPlayer(id))?;
        if !self.players[idx].alive {
            return Err(EngineError::PartyLost(
                self.players[idx].name.clone(),
            ));
        }
        Ok(idx)
    }

    pub(crate) fn expect_main_menu(
        &self,
        message: &'static str,
    ) -> Result<(), EngineError> {
        match self.pending {
            Pending::None => Ok(()),
            _ => Err(EngineError::WrongPhase {
                message,
                phase: self.phase(),
            }),
        }
    }

    fn continue_travel(&mut self, idx: usize, chosen: EatingTier) -> String {
        let eating = if self.players[idx].is_human() {
            chosen
        } else {
            self.automated_eating()
        };
        let mut log = Vec::new();

        if self.resources.food < STARVATION_FLOOR {
            log.push("The wagon is out of food and the party is starving!".to_string());
            log.extend(self.damage_all(idx, STARVATION_DAMAGE));
            if !self.players[idx].alive {
                self.clamp_resources();
                return join(log);
            }
        }

        self.resources.food -= 8.0 + 5.0 * f64::from(eating.level());
        let travel =
            80.0 + (self.oxen - START_OXEN) / 5.0 + 15.0 * self.dice.unit();
        self.mileage += travel;
        log.push(format!("Traveled {travel:.0} miles this week."));

        note(&mut log, self.cross_rivers(idx));

        if travel > 1.0 && self.players[idx].alive && !self.finished {
            if let Some(encounter) =
                riders::roll_encounter(self.mileage, &mut self.dice)
            {
                log.push(encounter.describe());
                if self.players[idx].is_human() {
                    self.pending = Pending::AwaitingRiderTactic {
                        hostile: encounter.hostile,
                        riders: encounter.riders,
                        eating,
                    };
                    self.clamp_resources();
                    log.push(
                        "Tactics: (1) run (2) attack (3) continue (4) circle wagons"
                            .to_string(),
                    );
                    return join(log);
                }
                let tactic =
                    riders::automated_tactic(encounter.hostile, &mut self.dice);
                note(
                    &mut log,
                    self.resolve_encounter(
                        idx,
                        encounter,
                        tactic,
                        AUTOMATED_BASELINE_REACTION_MS,
                    ),
                );
            }
        }

        self.finish_turn(idx, eating, &mut log);
        join(log)
    }

    /// Runs the part of a turn that follows travel: the random event,
    /// mountains, illness, and the arrival check.
    pub(crate) fn finish_turn(
        &mut self,
        idx: usize,
        eating: EatingTier,
        log: &mut Vec<String>,
    ) {
        if self.still_travelling(idx) {
            note(log, self.random_event(idx));
        }
        if self.still_travelling(idx) && self.mileage > MOUNTAIN_THRESHOLD {
            note(log, self.mountains(idx));
        }
        if self.still_travelling(idx) {
            note(log, self.illness(idx, eating));
        }
        self.clamp_resources();
        self.check_arrival(idx, log);
    }

    fn still_travelling(&self, idx: usize) -> bool {
        !self.finished && self.players[idx].alive
    }

    fn automated_eating(&self) -> EatingTier {
        if self.resources.food > 200.0 {
            EatingTier::Well
        } else if self.resources.food > 100.0 {
            EatingTier::Moderately
        } else {
            EatingTier::Poorly
        }
    }

    /// Ends the journey in victory once the wagon reaches Oregon.
    pub(crate) fn check_arrival(&mut self, idx: usize, log: &mut Vec<String>) {
        if self.finished
            || !self.players[idx].alive
            || self.mileage < TRAIL_LENGTH
        {
            return;
        }
        self.finished = true;
        self.won = true;
        self.pending = Pending::None;
        let date = arrival_date(self.turn);
        log.push(format!(
            "Congratulations! {} arrived in Oregon City on {date}.",
            self.players[idx].name
        ));
        self.arrival_date = Some(date);
    }

    // -----------------------------------------------------------------
    // Damage
    // -----------------------------------------------------------------

    /// Wounds one member of a player's party.
    ///
    /// At zero health the member dies. If that member is the leader the
    /// player's run is over, and when no human is left alive the whole
    /// journey is finished.
    pub fn damage_party_member(
        &mut self,
        id: PlayerId,
        member: usize,
        amount: u32,
    ) -> Result<String, EngineError> {
        let idx = self
            .index_of(id)
            .ok_or(EngineError::UnknownPlayer(id))?;
        let story = self.damage_member(idx, member, amount);
        self.clamp_resources();
        Ok(story)
    }

    /// The penalty for letting the turn clock run out: a random member
    /// catches dysentery.
    pub fn apply_timeout_penalty(
        &mut self,
        id: PlayerId,
        amount: u32,
    ) -> Result<String, EngineError> {
        let idx = self
            .index_of(id)
            .ok_or(EngineError::UnknownPlayer(id))?;
        self.pending = Pending::None;
        let name = self.players[idx].name.clone();
        let hurt = self.damage_random_member(idx, amount);
        self.clamp_resources();
        Ok(format!("{name} took too long and caught dysentery. {hurt}")
            .trim_end()
            .to_string())
    }

    pub(crate) fn damage_member(
        &mut self,
        idx: usize,
        member: usize,
        amount: u32,
    ) -> String {
        let Some(m) = self.players[idx].party.get_mut(member) else {
            return String::new();
        };
        if !m.alive {
            return String::new();
        }

        let remaining = i64::from(m.health) - i64::from(amount);
        if remaining > 0 {
            m.health = remaining as u8;
            m.injured = true;
            return format!("{} was hurt.", m.name);
        }

        m.health = 0;
        m.alive = false;
        m.injured = false;
        let member_name = m.name.clone();
        if member != 0 {
            return format!("{member_name} has died.");
        }

        self.players[idx].alive = false;
        let player_name = self.players[idx].name.clone();
        tracing::debug!(player = %self.players[idx].id, "party leader died");
        if !self.players.iter().any(Player::can_hold_turn) {
            self.finish_without_winner();
        }
        format!("{player_name}'s party leader has died. The journey is over for {player_name}.")
    }

    pub(crate) fn damage_random_member(
        &mut self,
        idx: usize,
        amount: u32,
    ) -> String {
        let living = self.players[idx].living_members();
        if living.is_empty() {
            return String::new();
        }
        let member = living[self.dice.below(living.len())];
        self.damage_member(idx, member, amount)
    }

    pub(crate) fn damage_all(&mut self, idx: usize, amount: u32) -> Vec<String> {
        self.players[idx]
            .living_members()
            .into_iter()
            .map(|member| self.damage_member(idx, member, amount))
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Floors every resource, the draft animals, and the odometer at zero.
    pub fn clamp_resources(&mut self) {
        self.resources.clamp();
        if self.oxen < 0.0 || self.oxen.is_nan() {
            self.oxen = 0.0;
        }
        if self.mileage < 0.0 || self.mileage.is_nan() {
            self.mileage = 0.0;
        }
    }

    pub(crate) fn spend(&mut self, resource: Resource, amount: f64) {
        *self.resources.get_mut(resource) -= amount;
    }
}

/// The calendar date after `turn` weeks on the trail, e.g. `July 5, 1847`.
pub(crate) fn arrival_date(turn: u32) -> String {
    let (y, m, d) = DEPARTURE;
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|start| start.checked_add_days(Days::new(u64::from(turn) * 7)))
        .map(|date| date.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| format!("week {turn} of {y}"))
}

pub(crate) fn note(log: &mut Vec<String>, line: String) {
    if !line.is_empty() {
        log.push(line);
    }
}

pub(crate) fn join(log: Vec<String>) -> String {
    log.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    /// Two humans on one wagon, standard outfit, turn 1.
    fn shared_game(dice: Dice) -> GameState {
        let mut game = GameState::new(dice);
        game.add_player(Player::human(pid(1), "Ada"));
        game.add_player(Player::human(pid(2), "Bo"));
        game.outfit();
        game.begin();
        game
    }

    #[test]
    fn test_reassign_player_moves_seat_to_new_id() {
        let mut game = shared_game(Dice::seeded(1));

        assert!(game.reassign_player(pid(1), pid(7)));
        assert!(!game.reassign_player(pid(1), pid(8)), "old id is gone");
        assert!(!game.reassign_player(pid(2), pid(7)), "new id is taken");

        assert_eq!(game.current_player_id(), Some(pid(7)));
        assert_eq!(game.player(pid(7)).map(|p| p.name.as_str()), Some("Ada"));
    }

    // =====================================================================
    // begin() / next_turn()
    // =====================================================================

    #[test]
    fn test_begin_gives_turn_to_first_human() {
        let mut game = GameState::new(Dice::seeded(1));
        game.add_player(Player::automated(pid(9), "Scout"));
        game.add_player(Player::human(pid(1), "Ada"));
        game.begin();

        assert_eq!(game.turn(), 1);
        assert_eq!(game.current_player_id(), Some(pid(1)));
        assert_eq!(game.phase(), TurnPhase::MainMenu);
    }

    #[test]
    fn test_next_turn_rotates_among_humans_only() {
        let mut game = GameState::new(Dice::seeded(1));
        game.add_player(Player::human(pid(1), "Ada"));
        game.add_player(Player::automated(pid(9), "Scout"));
        game.add_player(Player::human(pid(2), "Bo"));
        game.begin();

        game.next_turn();
        assert_eq!(game.current_player_id(), Some(pid(2)));
        game.next_turn();
        assert_eq!(game.current_player_id(), Some(pid(1)));
        assert_eq!(game.turn(), 3);
    }

    #[test]
    fn test_next_turn_bumps_week_every_fourth_turn() {
        let mut game = shared_game(Dice::seeded(1));
        for _ in 0..3 {
            game.next_turn();
        }
        assert_eq!(game.turn(), 4);
        assert_eq!(game.week(), 1);
    }

    #[test]
    fn test_next_turn_skips_dead_players() {
        let mut game = shared_game(Dice::seeded(1));
        game.add_player(Player::human(pid(3), "Cy"));
        game.damage_party_member(pid(2), 0, 200).unwrap();

        game.next_turn();

        assert_eq!(game.current_player_id(), Some(pid(3)));
    }

    #[test]
    fn test_next_turn_finishes_when_no_human_alive() {
        let mut game = shared_game(Dice::seeded(1));
        game.players[0].alive = false;
        game.players[1].alive = false;

        game.next_turn();

        assert!(game.is_finished());
        assert!(!game.is_won());
    }

    // =====================================================================
    // damage_party_member()
    // =====================================================================

    #[test]
    fn test_damage_member_wounds_without_killing() {
        let mut game = shared_game(Dice::seeded(1));
        game.damage_party_member(pid(1), 2, 30).unwrap();

        let son = &game.player(pid(1)).unwrap().party[2];
        assert_eq!(son.health, 70);
        assert!(son.alive);
        assert!(son.injured);
    }

    #[test]
    fn test_damage_leader_to_zero_ends_players_run() {
        let mut game = shared_game(Dice::seeded(1));

        let story = game.damage_party_member(pid(1), 0, 100).unwrap();

        let ada = game.player(pid(1)).unwrap();
        assert!(!ada.alive);
        assert_eq!(ada.party[0].health, 0);
        assert!(story.contains("journey is over"));
        // Bo is still alive, so the shared journey goes on.
        assert!(!game.is_finished());
    }

    #[test]
    fn test_damage_last_human_leader_finishes_journey() {
        let mut game = shared_game(Dice::seeded(1));
        game.damage_party_member(pid(1), 0, 100).unwrap();
        game.damage_party_member(pid(2), 0, 100).unwrap();

        assert!(game.is_finished());
        assert_eq!(game.phase(), TurnPhase::Finished);
        assert_eq!(game.current_player_id(), None);
    }

    #[test]
    fn test_damage_dead_member_is_noop() {
        let mut game = shared_game(Dice::seeded(1));
        game.damage_party_member(pid(1), 4, 100).unwrap();
        let story = game.damage_party_member(pid(1), 4, 100).unwrap();
        assert!(story.is_empty());
    }

    #[test]
    fn test_damage_unknown_player_is_error() {
        let mut game = shared_game(Dice::seeded(1));
        assert_eq!(
            game.damage_party_member(pid(77), 0, 10),
            Err(EngineError::UnknownPlayer(pid(77)))
        );
    }

    // =====================================================================
    // remove_player()
    // =====================================================================

    #[test]
    fn test_remove_turn_holder_passes_turn_and_clears_pending() {
        let mut game = shared_game(Dice::seeded(1));
        game.add_player(Player::human(pid(3), "Cy"));
        game.pending = Pending::AwaitingHunt;

        let removed = game.remove_player(pid(1)).unwrap();

        assert!(removed.held_turn);
        assert_eq!(game.current_player_id(), Some(pid(2)));
        assert_eq!(game.phase(), TurnPhase::MainMenu);
    }

    #[test]
    fn test_remove_earlier_seat_keeps_current_player() {
        let mut game = shared_game(Dice::seeded(1));
        game.add_player(Player::human(pid(3), "Cy"));
        game.next_turn();
        game.next_turn();
        assert_eq!(game.current_player_id(), Some(pid(3)));

        let removed = game.remove_player(pid(1)).unwrap();

        assert!(!removed.held_turn);
        assert_eq!(game.current_player_id(), Some(pid(3)));
    }

    #[test]
    fn test_remove_last_seat_while_holding_turn_wraps() {
        let mut game = shared_game(Dice::seeded(1));
        game.next_turn();
        assert_eq!(game.current_player_id(), Some(pid(2)));

        game.remove_player(pid(2));

        assert_eq!(game.current_player_id(), Some(pid(1)));
    }

    #[test]
    fn test_remove_last_living_human_finishes() {
        let mut game = shared_game(Dice::seeded(1));
        game.damage_party_member(pid(2), 0, 100).unwrap();

        game.remove_player(pid(1));

        assert!(game.is_finished());
    }

    // =====================================================================
    // restart() / arrival_date()
    // =====================================================================

    #[test]
    fn test_restart_revives_and_restocks() {
        let mut game = GameState::new(Dice::seeded(3));
        game.add_player(Player::human(pid(1), "Ada"));
        game.outfit();
        game.begin();
        game.set_mileage(900.0);
        game.damage_party_member(pid(1), 0, 100).unwrap();
        assert!(game.is_finished());

        game.restart(pid(1)).unwrap();

        assert!(!game.is_finished());
        assert_eq!(game.mileage(), 0.0);
        assert_eq!(game.resources().cash, START_CASH);
        assert_eq!(game.turn(), 1);
        assert!(game.player(pid(1)).unwrap().alive);
    }

    #[test]
    fn test_arrival_date_counts_weeks_from_departure() {
        assert_eq!(arrival_date(0), "March 29, 1847");
        assert_eq!(arrival_date(14), "July 5, 1847");
    }

    #[test]
    fn test_outfit_automated_spends_within_budget() {
        let mut game = GameState::new(Dice::seeded(11));
        game.outfit_automated();
        assert!(game.resources().is_clamped());
        assert!(game.resources().cash <= START_CASH);
        assert!(game.oxen() >= 200.0);
    }
}
